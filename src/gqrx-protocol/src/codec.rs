// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Command encoding.

use gqrx_core::{validate_mode, GqrxError, GqrxResult};

/// Default TCP port of the Gqrx remote-control server.
pub const DEFAULT_PORT: u16 = 7356;

/// Terminator appended to every outbound command line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// One command understood by the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum GqrxCommand {
    GetFreq,
    SetFreq(i64),
    GetDemod,
    SetDemod { mode: String, bandwidth: i64 },
    GetSignalStrength,
    GetSquelch,
    SetSquelch(f64),
    GetMute,
    SetMute(bool),
    GetDsp,
    SetDsp(bool),
    Close,
    /// Unlisted command passed through verbatim, with the number of reply
    /// lines the receiver answers it with.
    Raw { line: String, reply_lines: usize },
}

impl GqrxCommand {
    /// Build a set-demodulator command, rejecting modes outside the mode table.
    pub fn set_demod(mode: &str, bandwidth: i64) -> GqrxResult<Self> {
        validate_mode(mode)?;
        if bandwidth < 0 {
            return Err(GqrxError::Validation(format!(
                "bandwidth must not be negative (got {bandwidth})"
            )));
        }
        Ok(GqrxCommand::SetDemod {
            mode: mode.to_string(),
            bandwidth,
        })
    }

    /// Build a raw command whose reply length is known from its verb.
    ///
    /// `m` answers with two lines and everything else with one. Commands
    /// whose reply length varies (`\dump_state`) need [`GqrxCommand::raw_lines`].
    pub fn raw(line: &str) -> GqrxResult<Self> {
        check_raw_line(line)?;
        match raw_reply_lines(line) {
            Some(reply_lines) => Ok(GqrxCommand::Raw {
                line: line.to_string(),
                reply_lines,
            }),
            None => Err(GqrxError::Validation(format!(
                "reply length of '{line}' varies; give the line count explicitly"
            ))),
        }
    }

    /// Build a raw command that expects exactly `reply_lines` reply lines.
    pub fn raw_lines(line: &str, reply_lines: usize) -> GqrxResult<Self> {
        check_raw_line(line)?;
        Ok(GqrxCommand::Raw {
            line: line.to_string(),
            reply_lines,
        })
    }

    /// Command line as sent on the wire, without terminator.
    pub fn to_line(&self) -> String {
        match self {
            GqrxCommand::GetFreq => "f".to_string(),
            GqrxCommand::SetFreq(hz) => format!("F {hz}"),
            GqrxCommand::GetDemod => "m".to_string(),
            GqrxCommand::SetDemod { mode, bandwidth } => format!("M {mode} {bandwidth}"),
            GqrxCommand::GetSignalStrength => "l STRENGTH".to_string(),
            GqrxCommand::GetSquelch => "l SQL".to_string(),
            GqrxCommand::SetSquelch(level) => format!("L SQL {level:.2}"),
            GqrxCommand::GetMute => "u MUTE".to_string(),
            GqrxCommand::SetMute(on) => format!("U MUTE {}", flag_arg(*on)),
            GqrxCommand::GetDsp => "u DSP".to_string(),
            GqrxCommand::SetDsp(on) => format!("U DSP {}", flag_arg(*on)),
            GqrxCommand::Close => "Q".to_string(),
            GqrxCommand::Raw { line, .. } => line.clone(),
        }
    }

    /// Command line including the CR LF terminator.
    pub fn encode(&self) -> String {
        format!("{}{}", self.to_line(), LINE_TERMINATOR)
    }

    /// Number of reply lines the receiver sends for this command.
    pub fn reply_lines(&self) -> usize {
        match self {
            GqrxCommand::Close => 0,
            GqrxCommand::GetDemod => 2,
            GqrxCommand::Raw { reply_lines, .. } => *reply_lines,
            _ => 1,
        }
    }
}

fn flag_arg(on: bool) -> u8 {
    u8::from(on)
}

/// Raw lines go out byte for byte, so only shapes that would corrupt the
/// command stream are refused.
fn check_raw_line(line: &str) -> GqrxResult<()> {
    if line.trim().is_empty() {
        return Err(GqrxError::Validation("raw command is empty".to_string()));
    }
    if line.contains(['\r', '\n']) {
        return Err(GqrxError::Validation(
            "raw command must be a single line".to_string(),
        ));
    }
    if matches!(verb(line), "q" | "Q") {
        return Err(GqrxError::Validation(
            "use disconnect to close the session".to_string(),
        ));
    }
    Ok(())
}

/// Reply length for a raw line, `None` when it depends on receiver state.
fn raw_reply_lines(line: &str) -> Option<usize> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("m"), None) => Some(2),
        (Some("\\dump_state" | "dump_state"), _) => None,
        _ => Some(1),
    }
}

fn verb(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}
