//! Error types for telescroll.
//!
//! This module defines the error taxonomy using `thiserror`. Most failures in
//! the scroll subsystem are recovered locally and never reach the caller:
//!
//! - [`TransportError`] - a display channel failed. The session loop treats
//!   every variant as "session gone" and cancels that session's timers.
//! - [`SettingsError`] - per-viewer settings could not be fetched. The
//!   coordinator falls back to built-in defaults for that viewer.
//! - [`AppError`] - top-level error for the binary, wrapping the failures that
//!   do stop the process (config, logging, terminal setup).
//!
//! Out-of-range numeric inputs (rate, interval, width) are not errors at all:
//! they are clamped silently by the engine.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::model::SessionId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error encompassing all fatal failure modes.
///
/// Only the binary produces this type. Library components recover from
/// transport and settings failures themselves.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration file exists but could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Source text file could not be read.
    #[error("Failed to read text from {path}: {source}")]
    TextRead {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Terminal setup or teardown failed.
    ///
    /// Failures while drawing individual frames are reported as
    /// [`TransportError`] instead and only end the affected session.
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    /// An identifier given on the command line was rejected.
    #[error("Invalid identifier: {0}")]
    Identifier(String),
}

/// Failure pushing a rendered frame to a display surface.
///
/// # Recovery
///
/// The session scroll loop catches every variant at the tick boundary and
/// cancels all timers for the affected session. Other sessions of the same
/// viewer keep running.
///
/// # Examples
///
/// ```
/// use telescroll::model::{SessionId, TransportError};
///
/// let err = TransportError::ConnectionClosed(SessionId::new("s-1").unwrap());
/// assert!(err.to_string().contains("s-1"));
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying channel for this session is closed.
    #[error("Display connection closed for session {0}")]
    ConnectionClosed(SessionId),

    /// Writing the frame failed at the I/O layer.
    #[error("Display I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The frame could not be encoded for the wire.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure fetching per-viewer settings from a settings source.
///
/// Never fatal: the coordinator logs it and applies
/// [`ViewerSettings::default`](crate::model::ViewerSettings::default).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("Failed to read settings at {path}: {reason}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Settings file is not valid TOML or has the wrong shape.
    #[error("Invalid settings in {path}: {reason}")]
    Parse {
        /// Path with invalid contents.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// The settings backend is not reachable.
    #[error("Settings source unavailable: {0}")]
    Unavailable(String),
}
