//! Shipping container codes as read off a captured crop, e.g. `TCNU 897179`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Placeholders a recognizer answers with when it could not read a code.
const UNRECOGNIZED: [&str; 2] = ["UNKNOWN", "ERROR"];

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{4})\s+(\d{6})$").expect("valid container code regex"))
}

fn owner_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{4}$").expect("valid owner regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6}$").expect("valid number regex"))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerCode {
    /// four uppercase letters
    pub owner: String,
    /// six digits
    pub number: String,
}

impl ContainerCode {
    pub fn new(owner: impl Into<String>, number: impl Into<String>) -> Result<Self, Error> {
        let owner = owner.into();
        let number = number.into();

        if !owner_regex().is_match(&owner) || !number_regex().is_match(&number) {
            return Err(Error::InvalidContainerCode(format!("{} {}", owner, number)));
        }

        Ok(Self { owner, number })
    }
}

impl FromStr for ContainerCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || UNRECOGNIZED.contains(&s) {
            return Err(Error::Unrecognized(s.to_string()));
        }

        let caps = code_regex()
            .captures(s)
            .ok_or_else(|| Error::InvalidContainerCode(s.to_string()))?;

        Ok(Self {
            owner: caps[1].to_string(),
            number: caps[2].to_string(),
        })
    }
}

impl fmt::Display for ContainerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.owner, self.number)
    }
}
