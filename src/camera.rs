// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Media capture collaborator: camera traits and a directory-backed source

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::{EcosortError, Result};

/// Preferred camera facing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear-facing camera (points at the item being sorted)
    Environment,
    User,
}

/// Requested stream parameters
#[derive(Debug, Clone)]
pub struct CameraConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            facing: Facing::Environment,
        }
    }
}

/// A source of live video streams. Opening may suspend (permission prompts,
/// device negotiation) and fails with [`EcosortError::MediaAccessDenied`]
/// when the device is refused or unavailable.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>>;
}

/// An open live stream. Exactly one session owns a stream at a time.
pub trait CameraStream: Send {
    /// Grab one encoded still frame from the stream
    fn grab_frame(&mut self) -> Result<Vec<u8>>;

    /// Stop all tracks and release the device. Idempotent; a stopped stream
    /// yields no further frames.
    fn stop(&mut self);
}

/// Media source that cycles through image files in a directory. Stands in for
/// a physical camera during development and in the `live` CLI command.
pub struct FrameDirCamera {
    dir: PathBuf,
}

impl FrameDirCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MediaSource for FrameDirCamera {
    async fn open(&self, _constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            EcosortError::MediaAccessDenied(format!(
                "Cannot open frame directory {:?}: {}",
                self.dir, e
            ))
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| {
                        ["jpg", "jpeg", "png", "webp", "bmp"]
                            .iter()
                            .any(|known| known.eq_ignore_ascii_case(e))
                    })
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(EcosortError::MediaAccessDenied(format!(
                "No image frames in {:?}",
                self.dir
            )));
        }

        info!("Opened frame directory {:?} ({} frames)", self.dir, frames.len());

        Ok(Box::new(FrameDirStream {
            frames,
            next: 0,
            stopped: false,
        }))
    }
}

struct FrameDirStream {
    frames: Vec<PathBuf>,
    next: usize,
    stopped: bool,
}

impl CameraStream for FrameDirStream {
    fn grab_frame(&mut self) -> Result<Vec<u8>> {
        if self.stopped {
            return Err(EcosortError::MediaAccessDenied(
                "Stream has been stopped".to_string(),
            ));
        }

        let path = &self.frames[self.next % self.frames.len()];
        self.next += 1;
        Ok(std::fs::read(path)?)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
