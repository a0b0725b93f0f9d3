//! Wire payloads of the collections API.
//!
//! - Detail: `collections/{rivers|lakes}/items/{subid}.json`, an arbitrary
//!   GeoJSON document that is shown and offered for download as-is.
//! - Trace: `collections/{upstreams|downstreams}/items/{subid}.json`, a
//!   feature whose `properties.{upstream|downstream}_uids` lists member uids.
//!   Depending on the server revision that list is a JSON array or a single
//!   `", "`-joined string.

use std::collections::BTreeSet;

use foundation::{FeatureUid, SubId, TraceDirection};
use serde::Deserialize;
use serde_json::Value;

use crate::client::FetchError;

/// Detail document for one clicked feature.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPayload {
    pub subid: SubId,
    pub document: Value,
}

impl DetailPayload {
    pub fn new(subid: SubId, document: Value) -> Self {
        Self { subid, document }
    }

    /// Pretty-printed document, as offered for download.
    pub fn pretty_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.document).unwrap_or_default()
    }

    /// File name offered for download.
    pub fn file_name(&self) -> String {
        format!("{}.geojson", self.subid)
    }
}

pub fn decode_detail(subid: SubId, bytes: &[u8]) -> Result<DetailPayload, FetchError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(DetailPayload::new(subid, document))
}

#[derive(Debug, Deserialize)]
struct TraceDocument {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

/// Decodes a trace document into member uids.
///
/// Order of first appearance is kept; duplicates and blank entries are
/// dropped. A `null` member list means no members.
pub fn decode_trace(
    direction: TraceDirection,
    bytes: &[u8],
) -> Result<Vec<FeatureUid>, FetchError> {
    let doc: TraceDocument =
        serde_json::from_slice(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    let field = direction.uids_field();
    let Some(raw) = doc.properties.get(field) else {
        return Err(FetchError::Decode(format!("missing properties.{field}")));
    };

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut push = |uid: Option<FeatureUid>| {
        if let Some(uid) = uid {
            if seen.insert(uid.clone()) {
                out.push(uid);
            }
        }
    };

    match raw {
        Value::Null => {}
        Value::String(joined) => joined.split(',').for_each(|s| push(FeatureUid::parse(s))),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push(FeatureUid::parse(s)),
                    Value::Number(n) => push(FeatureUid::parse(&n.to_string())),
                    other => {
                        return Err(FetchError::Decode(format!(
                            "unexpected member in {field}: {other}"
                        )));
                    }
                }
            }
        }
        other => {
            return Err(FetchError::Decode(format!(
                "unexpected {field} value: {other}"
            )));
        }
    }
    Ok(out)
}
