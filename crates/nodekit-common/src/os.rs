//! Node operating system families

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Operating system family of the node AMI.
///
/// The family determines which bootstrap customization hooks are available
/// (see [`crate::userdata`]) and which EKS-optimized AMI is used when no
/// custom AMI id is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsKind {
    /// Amazon Linux 2
    #[serde(rename = "AL2")]
    Al2,
    /// Amazon Linux 2023
    #[serde(rename = "AL2023")]
    Al2023,
    /// Bottlerocket
    #[serde(rename = "BOTTLEROCKET")]
    Bottlerocket,
    /// Windows Server
    #[serde(rename = "WINDOWS")]
    Windows,
}

impl OsKind {
    /// All supported OS families
    pub const ALL: [OsKind; 4] = [
        OsKind::Al2,
        OsKind::Al2023,
        OsKind::Bottlerocket,
        OsKind::Windows,
    ];

    /// Canonical upper-case name as it appears in input files
    pub fn as_str(&self) -> &'static str {
        match self {
            OsKind::Al2 => "AL2",
            OsKind::Al2023 => "AL2023",
            OsKind::Bottlerocket => "BOTTLEROCKET",
            OsKind::Windows => "WINDOWS",
        }
    }

    /// Title-cased family name used in error messages
    pub fn title(&self) -> &'static str {
        match self {
            OsKind::Al2 => "Al2",
            OsKind::Al2023 => "Al2023",
            OsKind::Bottlerocket => "Bottlerocket",
            OsKind::Windows => "Windows",
        }
    }
}

impl Default for OsKind {
    fn default() -> Self {
        OsKind::Al2023
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AL2" => Ok(OsKind::Al2),
            "AL2023" => Ok(OsKind::Al2023),
            "BOTTLEROCKET" => Ok(OsKind::Bottlerocket),
            "WINDOWS" => Ok(OsKind::Windows),
            other => Err(ConfigError::UnknownOsKind {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_families() {
        for os in OsKind::ALL {
            assert_eq!(os.as_str().parse::<OsKind>().unwrap(), os);
        }
    }

    #[test]
    fn rejects_unknown_values() {
        let err = "UBUNTU".parse::<OsKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOsKind { .. }));
        assert!(err.to_string().contains("UBUNTU"));

        // Case matters: input files use the canonical upper-case form
        assert!("al2".parse::<OsKind>().is_err());
    }

    #[test]
    fn title_casing() {
        assert_eq!(OsKind::Bottlerocket.title(), "Bottlerocket");
        assert_eq!(OsKind::Windows.title(), "Windows");
        assert_eq!(OsKind::Al2023.title(), "Al2023");
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&OsKind::Bottlerocket).unwrap();
        assert_eq!(json, "\"BOTTLEROCKET\"");
        let os: OsKind = serde_json::from_str("\"AL2\"").unwrap();
        assert_eq!(os, OsKind::Al2);
    }
}
