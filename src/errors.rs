//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`HorizonError`] covers every failure mode of the
//! render-pass pipeline:
//! - Malformed pass graphs and configuration
//! - Shader compilation failures (always naming the offending pass)
//! - Shader and dataset I/O
//! - Malformed scientific datasets
//! - Frame read-back failures
//! - GPU initialization failures
//!
//! None of these are retried by the engine. Each variant carries enough
//! context (pass name, path, or shape detail) to diagnose the failure
//! without re-running.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, HorizonError>`.
//!
//! ```rust,ignore
//! use horizon::errors::{HorizonError, Result};
//!
//! fn setup() -> Result<()> {
//!     Err(HorizonError::Configuration("no passes declared".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum HorizonError {
    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// The pass graph or configuration is malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pass program failed to compile or link.
    #[error("Shader compile error in pass '{pass}': {diagnostic}")]
    ShaderCompile {
        /// Name of the pass whose program failed
        pass: String,
        /// Compiler diagnostic text
        diagnostic: String,
    },

    /// A shader template could not be rendered.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// A shader source or dataset could not be fetched.
    #[error("Failed to fetch '{path}': status {status}")]
    Io {
        /// Path or identifier that was requested
        path: String,
        /// HTTP-like status code describing the failure
        status: u16,
    },

    /// JSON parsing error (configuration or dataset).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// The scientific dataset does not have the expected shape.
    #[error("Data shape error: {0}")]
    DataShape(String),

    // ========================================================================
    // Capture Errors
    // ========================================================================
    /// The display surface could not be read back.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A captured frame could not be encoded.
    #[error("Image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),

    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A device operation referenced a released or unknown resource.
    #[error("Device error: {0}")]
    Device(String),
}

impl HorizonError {
    /// Shorthand for a [`HorizonError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for a [`HorizonError::DataShape`] error.
    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::DataShape(message.into())
    }

    /// Returns `true` for errors that abort pipeline startup.
    #[must_use]
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::ShaderCompile { .. }
                | Self::Template(_)
                | Self::Io { .. }
                | Self::DataShape(_)
                | Self::AdapterRequestFailed(_)
                | Self::DeviceCreateFailed(_)
        )
    }
}

/// Alias for `Result<T, HorizonError>`.
pub type Result<T> = std::result::Result<T, HorizonError>;
