use std::fmt;

/// Stable, opaque identifier of one rendered tile feature.
///
/// This is the key used for per-feature style overrides and nothing else.
/// Domain lookups (detail, trace) go through [`SubId`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureUid(String);

impl FeatureUid {
    pub fn new(raw: impl Into<String>) -> Self {
        FeatureUid(raw.into())
    }

    /// Parses a uid as it appears in tile properties or trace payloads.
    ///
    /// Surrounding whitespace is ignored; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(FeatureUid(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sub-basin identifier used for display and for the collections API.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubId(String);

impl SubId {
    pub fn new(raw: impl Into<String>) -> Self {
        SubId(raw.into())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(SubId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
