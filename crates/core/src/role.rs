use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Roles recognised by the storefront.
///
/// Parsing is case-insensitive. Unknown role names are not an error for the
/// session as a whole: the holder stays authenticated but gets no role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Administrador,
    Cliente,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrador => "ADMINISTRADOR",
            Self::Cliente => "CLIENTE",
        }
    }

    /// Normalise a raw role claim, returning `None` for unrecognised values
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMINISTRADOR" => Ok(Self::Administrador),
            "CLIENTE" => Ok(Self::Cliente),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
