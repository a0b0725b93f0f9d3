use foundation::{FeatureKind, SubId, TraceDirection};

/// A document served by the collections API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Detail { kind: FeatureKind, subid: SubId },
    Trace { direction: TraceDirection, subid: SubId },
}

impl Resource {
    pub fn detail(kind: FeatureKind, subid: SubId) -> Self {
        Resource::Detail { kind, subid }
    }

    pub fn trace(direction: TraceDirection, subid: SubId) -> Self {
        Resource::Trace { direction, subid }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Resource::Detail { kind, .. } => kind.collection(),
            Resource::Trace { direction, .. } => direction.collection(),
        }
    }

    pub fn subid(&self) -> &SubId {
        match self {
            Resource::Detail { subid, .. } | Resource::Trace { subid, .. } => subid,
        }
    }

    /// Path relative to the API root: `collections/{collection}/items/{subid}.json`.
    pub fn path(&self) -> String {
        format!("collections/{}/items/{}.json", self.collection(), self.subid())
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::Resource;
    use foundation::{FeatureKind, SubId, TraceDirection};

    #[test]
    fn detail_url_uses_kind_collection() {
        let r = Resource::detail(FeatureKind::Lake, SubId::new("42"));
        assert_eq!(
            r.url("https://example.test/bbox-server/"),
            "https://example.test/bbox-server/collections/lakes/items/42.json"
        );
    }

    #[test]
    fn trace_url_uses_direction_collection() {
        let r = Resource::trace(TraceDirection::Downstream, SubId::new("7"));
        assert_eq!(r.path(), "collections/downstreams/items/7.json");
    }
}
