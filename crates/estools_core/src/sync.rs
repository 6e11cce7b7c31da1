use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::info;

use crate::client::{ClusterApi, endpoint};
use crate::index_config::IndexConfig;
use crate::version::ClusterVersion;

pub const DOC_TYPE: &str = "_doc";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkewAdjustments {
    pub include_type_name: bool,
    pub wrapped_doc_type: bool,
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub url: Url,
    pub dest_index: String,
    pub body: Value,
    pub source_version: ClusterVersion,
    pub destination_version: ClusterVersion,
    pub adjustments: SkewAdjustments,
}

/// Overlay `mappings` onto `settings`; mapping keys win on collision.
pub fn merge_index_configs(settings: IndexConfig, mappings: IndexConfig) -> IndexConfig {
    let mut merged = settings;
    merged.extend(mappings);
    merged
}

/// Reshape `payload` for clusters on opposite sides of the typeless boundary.
pub fn apply_version_skew(
    payload: &mut IndexConfig,
    source: &ClusterVersion,
    destination: &ClusterVersion,
) -> SkewAdjustments {
    let mut adjustments = SkewAdjustments {
        include_type_name: source.has_mapping_types() && !destination.has_mapping_types(),
        wrapped_doc_type: false,
    };

    if destination.has_mapping_types() {
        let typeless = payload
            .get("mappings")
            .and_then(Value::as_object)
            .is_some_and(|mappings| mappings.contains_key("properties"));
        if typeless && let Some(mappings) = payload.remove("mappings") {
            let mut typed = Map::new();
            typed.insert(DOC_TYPE.to_string(), mappings);
            payload.insert("mappings".to_string(), Value::Object(typed));
            adjustments.wrapped_doc_type = true;
        }
    }

    adjustments
}

pub fn build_sync_plan(
    dest_addr: &str,
    dest_index: &str,
    mut payload: IndexConfig,
    source_version: ClusterVersion,
    destination_version: ClusterVersion,
) -> Result<SyncPlan> {
    let adjustments = apply_version_skew(&mut payload, &source_version, &destination_version);
    let mut url = endpoint(dest_addr, &[dest_index])?;
    if adjustments.include_type_name {
        url.query_pairs_mut().append_pair("include_type_name", "true");
    }

    Ok(SyncPlan {
        url,
        dest_index: dest_index.to_string(),
        body: Value::Object(payload),
        source_version,
        destination_version,
        adjustments,
    })
}

pub fn execute_sync_plan<A: ClusterApi>(api: &mut A, plan: &SyncPlan) -> Result<Value> {
    let response = api.put_json(&plan.url, &plan.body).context("put index")?;
    info!(
        index = %plan.dest_index,
        url = %plan.url,
        include_type_name = plan.adjustments.include_type_name,
        wrapped_doc_type = plan.adjustments.wrapped_doc_type,
        "destination index written"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        DOC_TYPE, SkewAdjustments, apply_version_skew, build_sync_plan, execute_sync_plan,
        merge_index_configs,
    };
    use crate::index_config::IndexConfig;
    use crate::testing::MockCluster;
    use crate::version::ClusterVersion;

    fn version(number: &str) -> ClusterVersion {
        ClusterVersion::parse(number).expect("version")
    }

    fn config(value: serde_json::Value) -> IndexConfig {
        serde_json::from_value(value).expect("config")
    }

    fn typeless_mappings() -> IndexConfig {
        config(json!({
            "mappings": { "properties": { "message": { "type": "text" } } }
        }))
    }

    #[test]
    fn merge_keeps_both_sections() {
        let settings = config(json!({ "settings": { "index": { "number_of_shards": "1" } } }));
        let merged = merge_index_configs(settings, typeless_mappings());
        assert!(merged.contains_key("settings"));
        assert!(merged.contains_key("mappings"));
    }

    #[test]
    fn merge_prefers_mapping_keys() {
        let settings = config(json!({ "settings": {}, "mappings": { "stale": true } }));
        let merged = merge_index_configs(settings, typeless_mappings());
        assert_eq!(
            merged["mappings"]["properties"]["message"]["type"],
            "text"
        );
        assert!(merged["mappings"].get("stale").is_none());
    }

    #[test]
    fn six_to_seven_requests_include_type_name() {
        let mut payload = config(json!({
            "mappings": { "_doc": { "properties": { "message": { "type": "text" } } } }
        }));
        let before = payload.clone();
        let adjustments = apply_version_skew(&mut payload, &version("6.8.23"), &version("7.17.0"));
        assert_eq!(
            adjustments,
            SkewAdjustments {
                include_type_name: true,
                wrapped_doc_type: false,
            }
        );
        assert_eq!(payload, before);
    }

    #[test]
    fn seven_to_six_wraps_properties_under_doc_type() {
        let mut payload = typeless_mappings();
        let adjustments = apply_version_skew(&mut payload, &version("7.10.2"), &version("6.8.0"));
        assert!(adjustments.wrapped_doc_type);
        assert!(!adjustments.include_type_name);
        assert_eq!(
            payload["mappings"][DOC_TYPE]["properties"]["message"]["type"],
            "text"
        );
        assert!(payload["mappings"].get("properties").is_none());
    }

    #[test]
    fn same_side_of_boundary_is_untouched() {
        for (source, destination) in [("7.1.0", "8.11.0"), ("6.2.4", "6.8.0"), ("8.0.0", "7.17.0")]
        {
            let mut payload = config(json!({
                "mappings": { "doc": { "properties": {} } }
            }));
            let before = payload.clone();
            let adjustments =
                apply_version_skew(&mut payload, &version(source), &version(destination));
            assert_eq!(adjustments, SkewAdjustments::default(), "{source} -> {destination}");
            assert_eq!(payload, before);
        }
    }

    #[test]
    fn settings_only_payload_is_never_wrapped() {
        let mut payload = config(json!({ "settings": { "index": { "number_of_shards": "2" } } }));
        let adjustments = apply_version_skew(&mut payload, &version("7.0.0"), &version("5.6.0"));
        assert!(!adjustments.wrapped_doc_type);
        assert!(!payload.contains_key("mappings"));
    }

    #[test]
    fn plan_targets_destination_index_with_query() {
        let plan = build_sync_plan(
            "http://es7:9200/",
            "logs-copy",
            typeless_mappings(),
            version("6.8.0"),
            version("7.4.0"),
        )
        .expect("plan");
        assert_eq!(
            plan.url.as_str(),
            "http://es7:9200/logs-copy?include_type_name=true"
        );
        assert_eq!(plan.dest_index, "logs-copy");
    }

    #[test]
    fn execute_puts_plan_body() {
        let plan = build_sync_plan(
            "http://es7:9200",
            "logs",
            typeless_mappings(),
            version("7.4.0"),
            version("7.4.0"),
        )
        .expect("plan");
        let mut api = MockCluster::default().with_put(
            "http://es7:9200/logs",
            200,
            json!({ "acknowledged": true, "index": "logs" }),
        );

        let response = execute_sync_plan(&mut api, &plan).expect("put");
        assert_eq!(response["acknowledged"], true);
        let request = api.requests.last().expect("request");
        assert_eq!(request.method, "PUT");
        assert_eq!(request.body.as_ref(), Some(&plan.body));
    }

    #[test]
    fn execute_reports_truncated_rejection() {
        let plan = build_sync_plan(
            "http://es7:9200",
            "logs",
            typeless_mappings(),
            version("7.4.0"),
            version("7.4.0"),
        )
        .expect("plan");
        let reason = "resource_already_exists_exception ".repeat(40);
        let mut api = MockCluster::default().with_put(
            "http://es7:9200/logs",
            400,
            json!({ "error": { "reason": reason } }),
        );

        let error = execute_sync_plan(&mut api, &plan).expect_err("must fail");
        let rendered = format!("{error:#}");
        assert!(rendered.starts_with("put index"));
        assert!(rendered.ends_with("..."));
    }
}
