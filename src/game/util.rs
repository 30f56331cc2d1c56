//! # Game Utilities Module
//!
//! This module makes room for common utility routines used throughout the
//! `crate::game` module.

use std::fmt;

use crate::game::Value;
use crate::game::error::GameError;

/* CONVERSIONS */

impl TryFrom<u8> for Value {
    type Error = GameError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            _ if v == Value::Undecided as u8 => Ok(Value::Undecided),
            _ if v == Value::Win as u8 => Ok(Value::Win),
            _ if v == Value::Lose as u8 => Ok(Value::Lose),
            _ if v == Value::Tie as u8 => Ok(Value::Tie),
            _ if v == Value::Draw as u8 => Ok(Value::Draw),
            _ => Err(GameError::ApiViolation {
                hint: format!(
                    "The byte {v} does not correspond to any position value.",
                ),
            }),
        }
    }
}

/* FORMATTING */

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undecided => write!(f, "undecided"),
            Value::Win => write!(f, "win"),
            Value::Lose => write!(f, "lose"),
            Value::Tie => write!(f, "tie"),
            Value::Draw => write!(f, "draw"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn value_bytes_round_trip() {
        for value in [
            Value::Undecided,
            Value::Win,
            Value::Lose,
            Value::Tie,
            Value::Draw,
        ] {
            assert_eq!(Value::try_from(value as u8).unwrap(), value);
        }

        assert!(Value::try_from(5).is_err());
    }
}
