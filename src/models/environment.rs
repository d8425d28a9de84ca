//! Environment sets and the capability of owning one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::environment;

/// A set of environment ids, kept sorted for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSet(BTreeSet<i64>);

impl EnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, environment_id: i64) -> bool {
        self.0.insert(environment_id)
    }

    pub fn contains(&self, environment_id: i64) -> bool {
        self.0.contains(&environment_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.0.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    /// Environments present in both sets.
    pub fn intersection(&self, other: &EnvironmentSet) -> EnvironmentSet {
        EnvironmentSet(self.0.intersection(&other.0).copied().collect())
    }

    /// Environments in `self` that are missing from `other`.
    pub fn difference(&self, other: &EnvironmentSet) -> EnvironmentSet {
        EnvironmentSet(self.0.difference(&other.0).copied().collect())
    }
}

impl FromIterator<i64> for EnvironmentSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        EnvironmentSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EnvironmentSet {
    type Item = &'a i64;
    type IntoIter = std::collections::btree_set::Iter<'a, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Anything that is scoped to a set of environments.
///
/// Runs and case versions own their sets and may change them; a run case
/// version holds a snapshot taken when it was created.
pub trait HasEnvironments {
    fn environments(&self) -> &EnvironmentSet;

    /// Environments shared with another environment-scoped object.
    fn shared_environments(&self, other: &impl HasEnvironments) -> EnvironmentSet {
        self.environments().intersection(other.environments())
    }

    fn supports_environment(&self, environment_id: i64) -> bool {
        self.environments().contains(environment_id)
    }
}

/// Environment as exposed by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnvironmentResponse {
    pub id: i64,
    pub name: String,
}

impl From<environment::Model> for EnvironmentResponse {
    fn from(m: environment::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scoped(EnvironmentSet);

    impl HasEnvironments for Scoped {
        fn environments(&self) -> &EnvironmentSet {
            &self.0
        }
    }

    #[test]
    fn test_shared_environments_is_intersection() {
        let run = Scoped([1, 2].into_iter().collect());
        let case_version = Scoped([2, 3].into_iter().collect());

        let shared = run.shared_environments(&case_version);
        assert_eq!(shared.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_disjoint_sets_share_nothing() {
        let a: EnvironmentSet = [1, 4].into_iter().collect();
        let b: EnvironmentSet = [2, 3].into_iter().collect();
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_difference_lists_removed_environments() {
        let before: EnvironmentSet = [1, 2, 3].into_iter().collect();
        let after: EnvironmentSet = [2, 5].into_iter().collect();
        assert_eq!(before.difference(&after).iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_serializes_as_sorted_array() {
        let set: EnvironmentSet = [9, 1, 5].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[1,5,9]");
    }
}
