//! # MNK Variant Handling Module
//!
//! This module helps parse the variant string provided to the MNK game into
//! parameters that can help build a game session.

use anyhow::Result;
use regex::Regex;

use crate::game::error::GameError;
use crate::game::mnk::NAME;
use crate::game::mnk::Session;

/* MNK VARIANT ENCODING */

pub const VARIANT_DEFAULT: &str = "3-3-3";
pub const VARIANT_PATTERN: &str = r"^[1-9]\d*-[1-9]\d*-[1-9]\d*$";
pub const VARIANT_PROTOCOL: &str = "The variant should be three dash-separated \
positive integers 'M-N-K', describing a board with M rows and N columns on \
which players alternately place marks, trying to be the first to align K of \
their own marks horizontally, vertically, or diagonally. The default '3-3-3' \
is Tic-Tac-Toe. The board may have at most 40 cells, and K cannot exceed the \
longer board dimension.";

/* API */

/// Returns an MNK game session set up using the parameters specified by
/// `variant`. Returns a `GameError::VariantMalformed` if the variant string
/// does not conform to the variant protocol.
pub fn parse_variant(variant: String) -> Result<Session> {
    check_variant_pattern(&variant)?;
    let params = parse_parameters(&variant)?;
    let (rows, cols, k) = (params[0], params[1], params[2]);
    if rows * cols > 40 {
        return Err(GameError::VariantMalformed {
            game: NAME,
            hint: "The board may have at most 40 cells.".to_string(),
        }
        .into());
    }

    if k > rows.max(cols) {
        return Err(GameError::VariantMalformed {
            game: NAME,
            hint: "K cannot exceed the longer board dimension.".to_string(),
        }
        .into());
    }

    Ok(Session::build(rows, cols, k))
}

/* VARIANT STRING VERIFICATION */

fn parse_parameters(variant: &str) -> Result<Vec<usize>, GameError> {
    variant
        .split('-')
        .map(|int_string| {
            int_string
                .parse::<usize>()
                .map_err(|e| GameError::VariantMalformed {
                    game: NAME,
                    hint: e.to_string(),
                })
        })
        .collect()
}

fn check_variant_pattern(variant: &str) -> Result<(), GameError> {
    let re = Regex::new(VARIANT_PATTERN).unwrap();
    if !re.is_match(variant) {
        Err(GameError::VariantMalformed {
            game: NAME,
            hint: format!(
                "String does not match the pattern '{VARIANT_PATTERN}'.",
            ),
        })
    } else {
        Ok(())
    }
}

/* TESTS */

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn default_variant_matches_variant_pattern() {
        let re = Regex::new(VARIANT_PATTERN).unwrap();
        assert!(re.is_match(VARIANT_DEFAULT));
    }

    #[test]
    fn oversized_and_unwinnable_variants_fail_checks() {
        assert!(parse_variant("7-6-4".into()).is_err()); // 42 cells
        assert!(parse_variant("3-3-4".into()).is_err()); // no line fits
        assert!(parse_variant("3-3".into()).is_err());
        assert!(parse_variant("3-0-3".into()).is_err());
    }

    #[test]
    fn playable_variants_pass_checks() {
        assert!(parse_variant("3-3-3".into()).is_ok());
        assert!(parse_variant("4-4-3".into()).is_ok());
        assert!(parse_variant("1-5-3".into()).is_ok());
        assert!(parse_variant("5-8-5".into()).is_ok());
    }
}
