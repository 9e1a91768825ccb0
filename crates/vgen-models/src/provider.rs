//! Provider selection tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which third-party provider a task was (or will be) submitted through.
///
/// Stored on every task so that callback handling can dispatch on the
/// recorded tag instead of sniffing the payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Direct Kling API (signed short-lived token auth)
    Kling,
    /// Kling hosted on the Fal queue (static key auth)
    Fal,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Kling => "kling",
            ProviderKind::Fal => "fal",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kling" => Ok(ProviderKind::Kling),
            "fal" => Ok(ProviderKind::Fal),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        assert_eq!("kling".parse::<ProviderKind>().unwrap(), ProviderKind::Kling);
        assert_eq!("FAL".parse::<ProviderKind>().unwrap(), ProviderKind::Fal);
        assert_eq!(ProviderKind::Kling.as_str(), "kling");
        assert!("hailuo".parse::<ProviderKind>().is_err());
    }
}
