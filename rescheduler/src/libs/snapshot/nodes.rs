//! Node snapshots

use k8s_openapi::api::core::v1::Node as RawNode;
use smokemini::Error;
use smokemini::models::NO_ZONE;

/// The stable zone label
const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
/// The deprecated zone label some older nodes still carry
const BETA_ZONE_LABEL: &str = "failure-domain.beta.kubernetes.io/zone";
/// The taint the cluster autoscaler sets on nodes it is about to remove
const AUTOSCALER_DELETE_TAINT: &str = "ToBeDeletedByClusterAutoscaler";

/// A node we could place a probe on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// The name of this node
    pub name: String,
    /// The zone this node is in
    pub zone: String,
    /// Whether new probes can be placed on this node
    pub schedulable: bool,
}

impl Node {
    /// Create a new node snapshot
    ///
    /// # Arguments
    ///
    /// * `name` - The name of this node
    /// * `zone` - The zone this node is in
    /// * `schedulable` - Whether this node can be scheduled on
    pub fn new<N: Into<String>, Z: Into<String>>(name: N, zone: Z, schedulable: bool) -> Self {
        Node {
            name: name.into(),
            zone: zone.into(),
            schedulable,
        }
    }
}

/// Check if a node has a ready condition set to true
///
/// # Arguments
///
/// * `node` - The node to check
fn is_ready(node: &RawNode) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conds| {
            conds
                .iter()
                .any(|cond| cond.type_ == "Ready" && cond.status == "True")
        })
        .unwrap_or(false)
}

impl TryFrom<&RawNode> for Node {
    type Error = Error;

    /// Build a node snapshot from a raw node
    ///
    /// # Arguments
    ///
    /// * `node` - The raw node to parse
    fn try_from(node: &RawNode) -> Result<Self, Self::Error> {
        // every node must have a name
        let name = match &node.metadata.name {
            Some(name) => name.clone(),
            None => return Err(Error::snapshot("Node", None, "node does not have a name")),
        };
        // get our zone from the stable label falling back to the beta one
        let zone = node
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(ZONE_LABEL).or_else(|| labels.get(BETA_ZONE_LABEL)))
            .filter(|zone| !zone.is_empty())
            .cloned()
            .unwrap_or_else(|| NO_ZONE.to_owned());
        // check if this node was cordoned or is about to be removed
        let (cordoned, deleting) = match &node.spec {
            Some(spec) => {
                let cordoned = spec.unschedulable.unwrap_or(false);
                let deleting = spec
                    .taints
                    .as_ref()
                    .map(|taints| taints.iter().any(|taint| taint.key == AUTOSCALER_DELETE_TAINT))
                    .unwrap_or(false);
                (cordoned, deleting)
            }
            None => (false, false),
        };
        let schedulable = !cordoned && is_ready(node) && !deleting;
        Ok(Node {
            name,
            zone,
            schedulable,
        })
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{NodeCondition, NodeSpec, NodeStatus, Taint};
    use std::collections::BTreeMap;

    use super::*;

    fn raw(zone: Option<&str>, ready: &str) -> RawNode {
        let mut node = RawNode::default();
        node.metadata.name = Some("n1".to_owned());
        if let Some(zone) = zone {
            node.metadata.labels = Some(BTreeMap::from([(ZONE_LABEL.to_owned(), zone.to_owned())]));
        }
        node.status = Some(NodeStatus {
            conditions: Some(vec![NodeCondition {
                type_: "Ready".to_owned(),
                status: ready.to_owned(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        node
    }

    #[test]
    fn ready_node_is_schedulable() {
        let node = Node::try_from(&raw(Some("A"), "True")).unwrap();
        assert_eq!(node, Node::new("n1", "A", true));
    }

    #[test]
    fn missing_zone_is_none() {
        let node = Node::try_from(&raw(None, "True")).unwrap();
        assert_eq!(node.zone, NO_ZONE);
    }

    #[test]
    fn beta_zone_label_is_used() {
        let mut node = raw(None, "True");
        node.metadata.labels = Some(BTreeMap::from([(BETA_ZONE_LABEL.to_owned(), "B".to_owned())]));
        assert_eq!(Node::try_from(&node).unwrap().zone, "B");
    }

    #[test]
    fn unschedulable_nodes() {
        // not ready
        assert!(!Node::try_from(&raw(Some("A"), "False")).unwrap().schedulable);
        // cordoned
        let mut cordoned = raw(Some("A"), "True");
        cordoned.spec = Some(NodeSpec {
            unschedulable: Some(true),
            ..Default::default()
        });
        assert!(!Node::try_from(&cordoned).unwrap().schedulable);
        // being removed by the autoscaler
        let mut deleting = raw(Some("A"), "True");
        deleting.spec = Some(NodeSpec {
            taints: Some(vec![Taint {
                key: AUTOSCALER_DELETE_TAINT.to_owned(),
                effect: "NoSchedule".to_owned(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        assert!(!Node::try_from(&deleting).unwrap().schedulable);
    }

    #[test]
    fn nameless_node_fails() {
        let mut node = raw(Some("A"), "True");
        node.metadata.name = None;
        assert!(matches!(Node::try_from(&node), Err(Error::SnapshotParse { .. })));
    }
}
