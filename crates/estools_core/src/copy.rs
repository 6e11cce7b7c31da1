use anyhow::{Result, bail};
use serde_json::Value;
use tracing::info;

use crate::client::{ClusterApi, ElasticClient, ElasticClientConfig};
use crate::index_config::{IndexConfig, fetch_mappings, fetch_settings};
use crate::sync::{SyncPlan, build_sync_plan, execute_sync_plan, merge_index_configs};
use crate::version::resolve_cluster_version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    Settings,
    Mappings,
    All,
}

impl CopyMode {
    /// `None` when no copy flag was given.
    pub fn from_flags(all: bool, copy_mappings: bool, copy_settings: bool) -> Option<Self> {
        match (all, copy_mappings, copy_settings) {
            (true, _, _) | (false, true, true) => Some(Self::All),
            (false, true, false) => Some(Self::Mappings),
            (false, false, true) => Some(Self::Settings),
            (false, false, false) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Mappings => "mappings",
            Self::All => "all",
        }
    }

    pub fn includes_settings(self) -> bool {
        matches!(self, Self::Settings | Self::All)
    }

    pub fn includes_mappings(self) -> bool {
        matches!(self, Self::Mappings | Self::All)
    }
}

#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub src_addr: String,
    pub dest_addr: String,
    pub src_index: String,
    pub dest_index: Option<String>,
    pub mode: CopyMode,
    pub dry_run: bool,
}

impl CopyRequest {
    /// Destination index, falling back to the source index.
    pub fn target_index(&self) -> &str {
        self.dest_index
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.src_index.trim())
    }
}

#[derive(Debug, Clone)]
pub struct CopyReport {
    pub plan: SyncPlan,
    pub sent: bool,
    pub acknowledged: Option<bool>,
    pub request_count: usize,
}

pub fn copy_index_config(
    request: &CopyRequest,
    client_config: &ElasticClientConfig,
) -> Result<CopyReport> {
    let mut api = ElasticClient::new(client_config.clone())?;
    copy_index_config_with_api(&mut api, request)
}

pub fn copy_index_config_with_api<A: ClusterApi>(
    api: &mut A,
    request: &CopyRequest,
) -> Result<CopyReport> {
    let src_index = request.src_index.trim();
    if src_index.is_empty() {
        bail!("--src_index is required, type --help for more details");
    }

    let payload = collect_payload(api, request, src_index)?;
    let source_version = resolve_cluster_version(api, &request.src_addr)?;
    let destination_version = resolve_cluster_version(api, &request.dest_addr)?;
    let plan = build_sync_plan(
        &request.dest_addr,
        request.target_index(),
        payload,
        source_version,
        destination_version,
    )?;

    if request.dry_run {
        info!(url = %plan.url, "dry run, skipping PUT");
        return Ok(CopyReport {
            plan,
            sent: false,
            acknowledged: None,
            request_count: api.request_count(),
        });
    }

    let response = execute_sync_plan(api, &plan)?;
    Ok(CopyReport {
        acknowledged: response.get("acknowledged").and_then(Value::as_bool),
        plan,
        sent: true,
        request_count: api.request_count(),
    })
}

fn collect_payload<A: ClusterApi>(
    api: &mut A,
    request: &CopyRequest,
    src_index: &str,
) -> Result<IndexConfig> {
    let settings = if request.mode.includes_settings() {
        Some(fetch_settings(api, &request.src_addr, src_index)?)
    } else {
        None
    };
    let mappings = if request.mode.includes_mappings() {
        Some(fetch_mappings(api, &request.src_addr, src_index)?)
    } else {
        None
    };

    Ok(match (settings, mappings) {
        (Some(settings), Some(mappings)) => merge_index_configs(settings, mappings),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => IndexConfig::new(),
    })
}
