//! One shot migrations of the smoke-mini values

use serde_json::Value;
use tracing::{Level, event};

use smokemini::models::Values;
use smokemini::models::values::{SMOKE_MINI, SMOKE_MINI_STORAGE_CLASS};

/// Drop the smoke-mini storage class override
///
/// The smoke-mini section is removed entirely when the override was all it held. Returns whether
/// the values changed.
///
/// # Arguments
///
/// * `values` - The values to migrate
pub fn force_no_storage_class(values: &mut Values) -> bool {
    let Some(removed) = values.remove(SMOKE_MINI_STORAGE_CLASS) else {
        return false;
    };
    let now_empty = values
        .get(SMOKE_MINI)
        .and_then(Value::as_object)
        .is_some_and(|section| section.is_empty());
    if now_empty {
        values.remove(SMOKE_MINI);
    }
    event!(
        Level::INFO,
        msg = "Removed smoke-mini storage class override",
        storage_class = ?removed,
        dropped_section = now_empty
    );
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn drops_lone_override() {
        let mut values = Values::new(json!({"upmeter": {"smokeMini": {"storageClass": "ceph"}}}));
        assert!(force_no_storage_class(&mut values));
        assert_eq!(values.doc(), &json!({"upmeter": {}}));
    }

    #[test]
    fn keeps_other_keys() {
        let mut values = Values::new(json!({
            "upmeter": {"smokeMini": {"storageClass": false, "ingress": true}}
        }));
        assert!(force_no_storage_class(&mut values));
        assert_eq!(values.doc(), &json!({"upmeter": {"smokeMini": {"ingress": true}}}));
    }

    #[test]
    fn missing_override_is_unchanged() {
        let mut values = Values::new(json!({"upmeter": {"smokeMiniDisabled": false}}));
        assert!(!force_no_storage_class(&mut values));
        assert_eq!(values.doc(), &json!({"upmeter": {"smokeMiniDisabled": false}}));
    }
}
