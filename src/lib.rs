// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! EcoSort: AI Waste Sorting Assistant
//!
//! Classifies photos of household items into waste categories with disposal
//! guidance, using a local vision model. Version 2.5 - live camera polling
//! with a web upload surface.

pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod live;
pub mod taxonomy;
pub mod web;

pub use config::AppConfig;
pub use error::{EcosortError, Result};
pub use taxonomy::{ClassificationResult, WasteCategory};
