use std::fmt;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::info;

use crate::client::{ClusterApi, endpoint};

/// First major release without mapping types.
pub const TYPELESS_MAJOR: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterVersion {
    pub major: u32,
    pub number: String,
}

impl ClusterVersion {
    pub fn parse(number: &str) -> Result<Self> {
        let number = number.trim();
        let major = number
            .split('.')
            .next()
            .filter(|component| !component.is_empty())
            .and_then(|component| component.parse::<u32>().ok())
            .ok_or_else(|| anyhow!("unrecognized cluster version number: {number:?}"))?;
        Ok(Self {
            major,
            number: number.to_string(),
        })
    }

    pub fn from_root_document(document: &Value) -> Result<Self> {
        let number = document
            .get("version")
            .and_then(|version| version.get("number"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("root document has no string `version.number`"))?;
        Self::parse(number)
    }

    pub fn has_mapping_types(&self) -> bool {
        self.major < TYPELESS_MAJOR
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.number)
    }
}

pub fn resolve_cluster_version<A: ClusterApi>(api: &mut A, addr: &str) -> Result<ClusterVersion> {
    let url = endpoint(addr, &[])?;
    let document = api
        .get_json(&url)
        .with_context(|| format!("get cluster version from {addr}"))?;
    let version = ClusterVersion::from_root_document(&document)
        .with_context(|| format!("get cluster version from {addr}"))?;
    info!(addr, version = %version, major = version.major, "resolved cluster version");
    Ok(version)
}
