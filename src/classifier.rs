// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification client: the boundary between images and the vision model

use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::camera::CameraStream;
use crate::inference::InferenceEngine;
use crate::taxonomy::{self, ClassificationResult};
use crate::{EcosortError, Result};

/// Longest image side submitted to the vision model
const MAX_IMAGE_SIDE: u32 = 640;

/// Wraps the inference engine behind a one-time readiness gate. Both the
/// upload path and the live polling loop classify through this client; each
/// call issues exactly one external request.
pub struct WasteClassifier {
    engine: Arc<dyn InferenceEngine>,
    ready: OnceCell<()>,
}

impl WasteClassifier {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            engine,
            ready: OnceCell::new(),
        }
    }

    /// One-time initialization: verify the engine is reachable and the
    /// configured model is available. Idempotent; concurrent callers collapse
    /// onto a single attempt. Classification fails with
    /// [`EcosortError::ModelNotReady`] until this has completed once.
    pub async fn init(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                info!("Checking inference engine availability...");
                self.engine.health_check().await?;

                if !self.engine.model_available().await? {
                    return Err(EcosortError::InferenceUnavailable(
                        "Configured vision model is not available".to_string(),
                    ));
                }

                info!("Inference engine ready");
                Ok(())
            })
            .await
            .copied()
    }

    /// Readiness query: true once [`init`](Self::init) has succeeded
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Classify an uploaded image. One-shot path: failures surface to the
    /// caller.
    pub async fn classify_image(&self, image_bytes: &[u8]) -> Result<ClassificationResult> {
        if !self.is_ready() {
            return Err(EcosortError::ModelNotReady);
        }

        let prepared = match prepare_image(image_bytes) {
            Ok(data) => data,
            Err(e) => {
                // Submit the original bytes; the model may still cope with
                // formats the image crate cannot decode.
                debug!("Image preparation failed ({}), submitting raw bytes", e);
                image_bytes.to_vec()
            }
        };

        let encoded = general_purpose::STANDARD.encode(&prepared);
        let verdict = self.engine.infer(&encoded).await?;

        debug!(
            "Model verdict: label={:?} confidence={:.2}",
            verdict.label, verdict.confidence
        );

        let mut result = taxonomy::resolve(&verdict.label, verdict.confidence);
        result.reasoning = verdict.reasoning;
        Ok(result)
    }

    /// Classify a single still frame grabbed from a live stream
    pub async fn classify_frame(
        &self,
        stream: &mut dyn CameraStream,
    ) -> Result<ClassificationResult> {
        let frame = stream.grab_frame()?;
        self.classify_image(&frame).await
    }
}

/// Downscale and re-encode an image for submission. Keeps the payload small
/// and the encoding consistent regardless of the upload format.
fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;

    let img = if img.width() > MAX_IMAGE_SIDE || img.height() > MAX_IMAGE_SIDE {
        img.resize(MAX_IMAGE_SIDE, MAX_IMAGE_SIDE, image::imageops::FilterType::Triangle)
    } else {
        img
    };

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

    Ok(buffer)
}
