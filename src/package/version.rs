use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version is empty")]
    Empty,
    #[error("'{0}' is not a valid version")]
    Invalid(String),
}

/// Pre-release stage suffix; declaration order is the sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Dev,
    Alpha,
    Beta,
    Final,
}

/// Dap version: dot separated numbers without leading zeros and an
/// optional `dev`, `a` or `b` suffix, e.g. `1.0`, `0.9.1dev`, `2b`.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    stage: Stage,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::Empty);
        }
        let invalid = || VersionError::Invalid(input.to_string());

        let (numbers, stage) = if let Some(rest) = input.strip_suffix("dev") {
            (rest, Stage::Dev)
        } else if let Some(rest) = input.strip_suffix('a') {
            (rest, Stage::Alpha)
        } else if let Some(rest) = input.strip_suffix('b') {
            (rest, Stage::Beta)
        } else {
            (input, Stage::Final)
        };

        let parts = numbers
            .split('.')
            .map(|part| {
                let digits_only = !part.is_empty() && part.bytes().all(|c| c.is_ascii_digit());
                let leading_zero = part.len() > 1 && part.starts_with('0');
                if !digits_only || leading_zero {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts, stage })
    }

    pub fn is_pre(&self) -> bool {
        self.stage != Stage::Final
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        let suffix = match self.stage {
            Stage::Dev => "dev",
            Stage::Alpha => "a",
            Stage::Beta => "b",
            Stage::Final => "",
        };
        write!(f, "{}{}", numbers.join("."), suffix)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.stage.cmp(&other.stage)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
