use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{ClusterApi, endpoint};

/// Index-scoped configuration object as returned by `_settings` or `_mappings`.
pub type IndexConfig = Map<String, Value>;

/// Keys under `settings.index` that the cluster generates and refuses on index creation.
pub const GENERATED_SETTINGS: &[&[&str]] = &[
    &["creation_date"],
    &["uuid"],
    &["version"],
    &["provided_name"],
    &["resize"],
    &["routing", "allocation", "initial_recovery"],
];

pub fn fetch_settings<A: ClusterApi>(api: &mut A, addr: &str, index: &str) -> Result<IndexConfig> {
    let url = endpoint(addr, &[index, "_settings"])?;
    let document = api.get_json(&url).context("get settings")?;
    let mut config = index_scoped(document, index).context("get settings")?;
    strip_generated_settings(&mut config).context("get settings")?;
    Ok(config)
}

pub fn fetch_mappings<A: ClusterApi>(api: &mut A, addr: &str, index: &str) -> Result<IndexConfig> {
    let url = endpoint(addr, &[index, "_mappings"])?;
    let document = api.get_json(&url).context("get mappings")?;
    index_scoped(document, index).context("get mappings")
}

pub fn strip_generated_settings(config: &mut IndexConfig) -> Result<()> {
    let index_settings = config
        .get_mut("settings")
        .and_then(Value::as_object_mut)
        .and_then(|settings| settings.get_mut("index"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("settings response has no `settings.index` object"))?;
    for path in GENERATED_SETTINGS {
        remove_path(index_settings, path);
    }
    Ok(())
}

/// Pick the entry for `index` out of a `{ "<index>": { ... } }` response.
///
/// Aliases come back keyed by the concrete index name, so a response holding
/// exactly one entry is accepted even when its key differs.
fn index_scoped(document: Value, index: &str) -> Result<IndexConfig> {
    let Value::Object(mut root) = document else {
        bail!("response is not a JSON object");
    };
    let scoped = match root.remove(index) {
        Some(scoped) => scoped,
        None if root.len() == 1 => {
            let (concrete, scoped) = root
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("response has no entry for index `{index}`"))?;
            debug!(requested = index, concrete = %concrete, "resolved alias");
            scoped
        }
        None => bail!("response has no entry for index `{index}`"),
    };
    match scoped {
        Value::Object(scoped) => Ok(scoped),
        _ => bail!("entry for index `{index}` is not a JSON object"),
    }
}

fn remove_path(object: &mut Map<String, Value>, path: &[&str]) {
    match path {
        [] => {}
        [leaf] => {
            object.remove(*leaf);
        }
        [head, rest @ ..] => {
            let emptied = match object.get_mut(*head).and_then(Value::as_object_mut) {
                Some(child) => {
                    remove_path(child, rest);
                    child.is_empty()
                }
                None => false,
            };
            if emptied {
                object.remove(*head);
            }
        }
    }
}
