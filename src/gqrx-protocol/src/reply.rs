// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Reply decoding.
//!
//! Reply lines arrive with their terminator already stripped. Surrounding
//! whitespace is ignored for numeric values.

use gqrx_core::{GqrxError, GqrxResult};

/// Decode a base-10 integer reply.
pub fn parse_int(raw: &str) -> GqrxResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| GqrxError::parse("integer", raw))
}

/// Decode a floating-point reply.
pub fn parse_float(raw: &str) -> GqrxResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GqrxError::parse("float", raw))
}

/// Decode a `0`/`1` flag reply.
pub fn parse_flag(raw: &str) -> GqrxResult<bool> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(GqrxError::parse("flag (0/1)", raw)),
    }
}

/// Check an acknowledgement line.
///
/// Gqrx answers set commands with `RPRT 0`; `RPRT <n>` with a non-zero
/// code is a rejection. Any other text is accepted as an ack.
pub fn parse_ack(raw: &str) -> GqrxResult<()> {
    match report_code(raw) {
        Some(0) | None => Ok(()),
        Some(code) => Err(GqrxError::protocol(format!(
            "command rejected by receiver (RPRT {code})"
        ))),
    }
}

/// Decode the two-line reply of the `m` command.
pub fn parse_demod(mode_line: &str, bandwidth_line: &str) -> GqrxResult<(String, i64)> {
    if let Some(code) = report_code(mode_line).filter(|code| *code != 0) {
        return Err(GqrxError::protocol(format!(
            "demodulator query rejected by receiver (RPRT {code})"
        )));
    }
    let mode = mode_line.trim();
    if mode.is_empty() {
        return Err(GqrxError::protocol("empty demodulator mode in reply"));
    }
    let bandwidth = parse_int(bandwidth_line)?;
    Ok((mode.to_string(), bandwidth))
}

fn report_code(raw: &str) -> Option<i64> {
    raw.trim()
        .strip_prefix("RPRT")
        .and_then(|rest| rest.trim().parse::<i64>().ok())
}
