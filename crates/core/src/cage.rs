// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cage code parsing and normalization.
//!
//! A cage code is a driver's pickup identifier: one letter `A`–`I`, a dash,
//! and a number (e.g. `A-1`). Input arrives from spreadsheets and manual
//! entry, so the parser tolerates lowercase and surrounding whitespace and
//! canonicalizes to uppercase. Lookups keyed by `CageCode` are therefore
//! case-insensitive by construction.

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;

/// A canonicalized cage code (`LETTER-NUMBER`, letter in `A`–`I`).
///
/// Construction goes through [`CageCode::parse`], which returns `None` for
/// malformed input rather than an error: a bad code is a lookup miss,
/// never a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CageCode(SmolStr);

impl CageCode {
    /// Parse and canonicalize a cage code. Returns `None` if the input does
    /// not match the `LETTER A–I, '-', digits` pattern.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if !('A'..='I').contains(&letter) {
            return None;
        }
        let digits = chars.as_str().strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(SmolStr::new(format!("{letter}-{digits}"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CageCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CageCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<'de> Deserialize<'de> for CageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CageCode::parse(&s).ok_or_else(|| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&s),
                &"a cage code of the form A-1",
            )
        })
    }
}

#[cfg(test)]
#[path = "cage_tests.rs"]
mod tests;
