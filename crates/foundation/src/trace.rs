use std::fmt;

/// Direction of a network trace relative to the clicked feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraceDirection {
    Upstream,
    Downstream,
}

impl TraceDirection {
    /// Collection serving member lists for this direction.
    pub fn collection(self) -> &'static str {
        match self {
            TraceDirection::Upstream => "upstreams",
            TraceDirection::Downstream => "downstreams",
        }
    }

    /// Property carrying the member uids in a trace document.
    pub fn uids_field(self) -> &'static str {
        match self {
            TraceDirection::Upstream => "upstream_uids",
            TraceDirection::Downstream => "downstream_uids",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceDirection::Upstream => f.write_str("upstream"),
            TraceDirection::Downstream => f.write_str("downstream"),
        }
    }
}
