use std::collections::BTreeSet;

use foundation::FeatureUid;

/// Members of one trace direction.
///
/// Ordering contract:
/// - Iteration yields uids in ascending order, so repaint order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSet {
    members: BTreeSet<FeatureUid>,
}

impl TraceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, uid: &FeatureUid) -> bool {
        self.members.contains(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureUid> {
        self.members.iter()
    }

    /// Empties the set, returning the previous members.
    pub fn take(&mut self) -> Vec<FeatureUid> {
        std::mem::take(&mut self.members).into_iter().collect()
    }

    /// Replaces the whole set, returning the previous members.
    pub fn replace(&mut self, next: TraceSet) -> Vec<FeatureUid> {
        std::mem::replace(self, next).members.into_iter().collect()
    }
}

impl FromIterator<FeatureUid> for TraceSet {
    fn from_iter<I: IntoIterator<Item = FeatureUid>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}
