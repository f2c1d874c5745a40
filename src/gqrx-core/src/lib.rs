// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod error;
pub mod mode;
pub mod state;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use error::{GqrxError, GqrxResult};
pub use mode::{is_valid_mode, validate_mode, DEMOD_MODES};
pub use state::ConnectionState;
