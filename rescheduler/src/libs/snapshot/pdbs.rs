//! Pod disruption budget snapshots

use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use smokemini::Error;

/// A probe disruption budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdb {
    /// The name of this budget
    pub name: String,
    /// How many disruptions this budget currently allows
    pub disruptions_allowed: i32,
}

impl TryFrom<&PodDisruptionBudget> for Pdb {
    type Error = Error;

    /// Build a budget snapshot from a raw budget
    ///
    /// # Arguments
    ///
    /// * `pdb` - The raw budget to parse
    fn try_from(pdb: &PodDisruptionBudget) -> Result<Self, Self::Error> {
        let name = match &pdb.metadata.name {
            Some(name) => name.clone(),
            None => return Err(Error::snapshot("PodDisruptionBudget", None, "budget has no name")),
        };
        // a budget without a status has not been evaluated yet and allows nothing
        let disruptions_allowed = pdb
            .status
            .as_ref()
            .map(|status| status.disruptions_allowed)
            .unwrap_or(0);
        Ok(Pdb {
            name,
            disruptions_allowed,
        })
    }
}

/// Whether our budgets allow at least one voluntary disruption
///
/// No budget at all means disruption is allowed.
///
/// # Arguments
///
/// * `pdbs` - The budgets to check
pub fn disruption_allowed(pdbs: &[Pdb]) -> bool {
    pdbs.iter().all(|pdb| pdb.disruptions_allowed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance() {
        assert!(disruption_allowed(&[]));
        let open = Pdb {
            name: "smoke-mini".to_owned(),
            disruptions_allowed: 1,
        };
        let closed = Pdb {
            name: "smoke-mini".to_owned(),
            disruptions_allowed: 0,
        };
        assert!(disruption_allowed(&[open]));
        assert!(!disruption_allowed(&[closed]));
    }
}
