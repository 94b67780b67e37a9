//! Loads and persists the smoke-mini values in a config map

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, PostParams};
use smokemini::Error;
use smokemini::conf::ValuesLocation;
use smokemini::models::Values;

/// Load our values from their config map
///
/// A missing config map or key is an empty values document.
///
/// # Arguments
///
/// * `api` - The config map api for our namespace
/// * `location` - Where our values are persisted
pub async fn load(
    api: &Api<ConfigMap>,
    location: &ValuesLocation,
) -> Result<(Values, Option<ConfigMap>), Error> {
    let Some(map) = api.get_opt(&location.config_map).await? else {
        return Ok((Values::default(), None));
    };
    let values = match map.data.as_ref().and_then(|data| data.get(&location.key)) {
        Some(raw) => Values::from_yaml(raw)?,
        None => Values::default(),
    };
    Ok((values, Some(map)))
}

/// Persist our values to their config map
///
/// An existing config map is replaced at the resource version it was loaded at so a concurrent
/// write fails instead of being lost.
///
/// # Arguments
///
/// * `api` - The config map api for our namespace
/// * `location` - Where our values are persisted
/// * `loaded` - The config map our values were loaded from
/// * `values` - The values to persist
/// * `field_manager` - The field manager to write with
pub async fn save(
    api: &Api<ConfigMap>,
    location: &ValuesLocation,
    loaded: Option<ConfigMap>,
    values: &Values,
    field_manager: &str,
) -> Result<ConfigMap, Error> {
    let params = PostParams {
        dry_run: false,
        field_manager: Some(field_manager.to_owned()),
    };
    let raw = values.to_yaml()?;
    match loaded {
        Some(mut map) => {
            map.data
                .get_or_insert_with(Default::default)
                .insert(location.key.clone(), raw);
            Ok(api.replace(&location.config_map, &params, &map).await?)
        }
        None => {
            let mut map = ConfigMap::default();
            map.metadata.name = Some(location.config_map.clone());
            map.data = Some([(location.key.clone(), raw)].into_iter().collect());
            Ok(api.create(&params, &map).await?)
        }
    }
}
