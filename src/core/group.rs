/// Group data model
///
/// A single group record as returned by either backend, plus the route
/// context that selects it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the authoritative record of a group lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "on-chain")]
    OnChain,
    #[serde(rename = "off-chain")]
    OffChain,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::OnChain => "on-chain",
            Provenance::OffChain => "off-chain",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group type '{0}' (expected 'on-chain' or 'off-chain')")]
pub struct UnknownProvenance(pub String);

impl FromStr for Provenance {
    type Err = UnknownProvenance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on-chain" => Ok(Provenance::OnChain),
            "off-chain" => Ok(Provenance::OffChain),
            other => Err(UnknownProvenance(other.to_string())),
        }
    }
}

/// Identifies the group a session manages. Supplied once, when the session opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub group_id: String,
    pub provenance: Provenance,
}

impl RouteContext {
    pub fn new(group_id: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            group_id: group_id.into(),
            provenance,
        }
    }
}

/// The group record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tree_depth: u32,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub api_enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Opaque; presence alone disables the API key feature.
    #[serde(default)]
    pub credentials: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Group {
    /// Maximum number of members, 2^tree_depth. `None` when it does not fit in a u64.
    pub fn capacity(&self) -> Option<u64> {
        1u64.checked_shl(self.tree_depth)
    }

    pub fn has_credentials(&self) -> bool {
        !matches!(self.credentials, None | Some(serde_json::Value::Null))
    }
}

#[cfg(test)]
pub(crate) fn sample_group() -> Group {
    Group {
        id: "10402173435763029700781503965100".to_string(),
        name: "Foo".to_string(),
        description: Some("Test group".to_string()),
        tree_depth: 16,
        members: vec!["a".to_string(), "b".to_string()],
        api_enabled: false,
        api_key: None,
        credentials: None,
        created_at: None,
    }
}
