// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for EcoSort

use thiserror::Error;

/// Result type alias for EcoSort operations
pub type Result<T> = std::result::Result<T, EcosortError>;

/// EcoSort error types
#[derive(Error, Debug)]
pub enum EcosortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Model not ready: call init() and wait for it to complete")]
    ModelNotReady,

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Camera access denied: {0}")]
    MediaAccessDenied(String),

    #[error("Live session failed: {0}")]
    LiveSession(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
