// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for EcoSort

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::camera::{CameraConstraints, Facing};
use crate::inference::DEFAULT_PROMPT;
use crate::live::LiveOptions;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// AI engine configuration
    pub engine: EngineConfig,

    /// Live polling settings
    #[serde(default)]
    pub live: LiveConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub url: String,
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LiveConfig {
    /// Seconds between poll starts (floor, not target)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Minimum confidence for a live result to reach the consumer
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_camera_side")]
    pub camera_width: u32,
    #[serde(default = "default_camera_side")]
    pub camera_height: u32,
    /// End the session after this many consecutive frame failures;
    /// absent means failures never surface
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_timeout() -> u64 { 120 }
fn default_poll_interval() -> u64 { 3 }
fn default_confidence_threshold() -> f64 { 0.3 }
fn default_camera_side() -> u32 { 640 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_prompt() -> String { DEFAULT_PROMPT.to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                url: "http://localhost:11434/api/generate".to_string(),
                model: "moondream".to_string(),
                prompt: default_prompt(),
                timeout_secs: default_timeout(),
            },
            live: LiveConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            confidence_threshold: default_confidence_threshold(),
            camera_width: default_camera_side(),
            camera_height: default_camera_side(),
            max_consecutive_failures: None,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::EcosortError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl LiveConfig {
    /// Build the live loop options from this section
    pub fn to_options(&self) -> LiveOptions {
        LiveOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            confidence_threshold: self.confidence_threshold,
            constraints: CameraConstraints {
                width: self.camera_width,
                height: self.camera_height,
                facing: Facing::Environment,
            },
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}
