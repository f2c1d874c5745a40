// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Demodulator modes accepted by the `M` command.

use crate::error::{GqrxError, GqrxResult};

/// Every mode name the receiver understands. Names are case-sensitive.
pub const DEMOD_MODES: &[&str] = &[
    "OFF",
    "RAW",
    "AM",
    "AMS",
    "LSB",
    "USB",
    "CWL",
    "CWR",
    "CWU",
    "CW",
    "FM",
    "WFM",
    "WFM_ST",
    "WFM_ST_OIRT",
];

pub fn is_valid_mode(mode: &str) -> bool {
    DEMOD_MODES.contains(&mode)
}

/// Reject a mode that is not in [`DEMOD_MODES`].
pub fn validate_mode(mode: &str) -> GqrxResult<()> {
    if is_valid_mode(mode) {
        Ok(())
    } else {
        Err(GqrxError::unknown_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_table_modes_are_valid() {
        for mode in DEMOD_MODES {
            assert!(validate_mode(mode).is_ok());
        }
    }

    #[test]
    fn test_modes_are_case_sensitive() {
        assert!(!is_valid_mode("fm"));
        assert!(!is_valid_mode("Wfm_St"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        for mode in ["", "SSB", "DIG", "FM ", "WFM-ST"] {
            assert!(matches!(
                validate_mode(mode),
                Err(GqrxError::Validation(_))
            ));
        }
    }
}
