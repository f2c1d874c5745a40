// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wire codec for the Gqrx remote-control protocol.
//!
//! Maps typed commands onto the ASCII command lines the receiver expects and
//! decodes reply lines into typed values. Performs no I/O.

pub mod codec;
pub mod reply;

pub use codec::{GqrxCommand, DEFAULT_PORT, LINE_TERMINATOR};
pub use reply::{parse_ack, parse_demod, parse_flag, parse_float, parse_int};
