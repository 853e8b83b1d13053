use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HiconaError, Result};

fn well_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"r(\d+)c(\d+)").unwrap())
}

/// A microtiter plate position, e.g. `r04c05`.
///
/// Ordering is row-major: all wells of row 1 sort before row 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WellId {
    pub row: u32,
    pub col: u32,
}

impl WellId {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{:02}c{:02}", self.row, self.col)
    }
}

impl FromStr for WellId {
    type Err = HiconaError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = well_token_regex()
            .captures(s)
            .filter(|c| c.get(0).map(|m| m.as_str().len()) == Some(s.len()))
            .ok_or_else(|| HiconaError::InvalidWellToken(s.to_string()))?;
        Ok(Self {
            row: caps[1]
                .parse()
                .map_err(|_| HiconaError::InvalidWellToken(s.to_string()))?,
            col: caps[2]
                .parse()
                .map_err(|_| HiconaError::InvalidWellToken(s.to_string()))?,
        })
    }
}

impl TryFrom<String> for WellId {
    type Error = HiconaError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<WellId> for String {
    fn from(w: WellId) -> String {
        w.to_string()
    }
}
