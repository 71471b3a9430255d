use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of characters in a scanned EPC.
pub const EPC_LENGTH: usize = 24;

/// Boundary rejections for scanner input. No remote or local call is made
/// for a value that fails here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpcError {
    #[error("EPC must be 24 characters long, got {0}")]
    WrongLength(usize),

    #[error("EPC must start with 'E'")]
    WrongPrefix,
}

/// An Electronic Product Code that passed the station's boundary check:
/// exactly 24 characters, starting with `E`.
///
/// Scanner input is trimmed and upper-cased before the check, the same way
/// the input field normalizes keystrokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Epc(String);

impl Epc {
    pub fn parse(input: &str) -> Result<Self, EpcError> {
        let normalized = input.trim().to_uppercase();

        let len = normalized.chars().count();
        if len != EPC_LENGTH {
            return Err(EpcError::WrongLength(len));
        }
        if !normalized.starts_with('E') {
            return Err(EpcError::WrongPrefix);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Epc {
    type Err = EpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Epc {
    type Error = EpcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Epc> for String {
    fn from(epc: Epc) -> Self {
        epc.0
    }
}

impl AsRef<str> for Epc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
