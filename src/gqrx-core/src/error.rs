// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::time::Duration;

use thiserror::Error;

use crate::mode::DEMOD_MODES;

/// Error type returned by every client operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GqrxError {
    /// Dial failed, the socket closed, or the client is not connected.
    #[error("connection error: {0}")]
    Connection(String),

    /// Write/flush failure or a malformed reply sequence.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request rejected before any I/O took place.
    #[error("validation error: {0}")]
    Validation(String),

    /// Reply text could not be decoded as the expected type.
    #[error("cannot parse reply '{raw}' as {expected}")]
    Parse { expected: &'static str, raw: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type GqrxResult<T> = Result<T, GqrxError>;

impl GqrxError {
    pub fn connection(msg: impl Into<String>) -> Self {
        GqrxError::Connection(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        GqrxError::Protocol(msg.into())
    }

    pub fn not_connected() -> Self {
        GqrxError::Connection("not connected".to_string())
    }

    pub fn parse(expected: &'static str, raw: impl Into<String>) -> Self {
        GqrxError::Parse {
            expected,
            raw: raw.into(),
        }
    }

    /// Validation failure for a demodulator mode missing from the mode table.
    pub fn unknown_mode(mode: &str) -> Self {
        GqrxError::Validation(format!(
            "mode not found: {} (available modes: {})",
            mode,
            DEMOD_MODES.join(", ")
        ))
    }
}
