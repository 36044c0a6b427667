//! Provenance events - one lineage step of a flow file

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single provenance event as emitted by the NiFi provenance reporting task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceEvent {
    #[serde(default, deserialize_with = "nullable")]
    pub event_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub event_ordinal: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub event_type: ProvenanceEventType,

    #[serde(default, deserialize_with = "nullable")]
    pub timestamp_millis: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub duration_millis: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub lineage_start: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub details: String,

    #[serde(default, deserialize_with = "nullable")]
    pub component_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub component_type: String,

    #[serde(default, deserialize_with = "nullable")]
    pub component_name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub process_group_id: String,

    /// Service name the span is grouped under
    #[serde(default, deserialize_with = "nullable")]
    pub process_group_name: String,

    /// Flow file UUID
    #[serde(default, deserialize_with = "nullable")]
    pub entity_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub entity_type: String,

    #[serde(default, deserialize_with = "nullable")]
    pub entity_size: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub previous_entity_size: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub updated_attributes: HashMap<String, String>,

    #[serde(default, deserialize_with = "nullable")]
    pub previous_attributes: HashMap<String, String>,

    #[serde(default, deserialize_with = "nullable")]
    pub actor_hostname: String,

    #[serde(rename = "contentURI", default, deserialize_with = "nullable")]
    pub content_uri: String,

    #[serde(rename = "previousContentURI", default, deserialize_with = "nullable")]
    pub previous_content_uri: String,

    /// Parent flow files, only populated for JOIN events
    #[serde(default, deserialize_with = "nullable")]
    pub parent_ids: Vec<String>,

    /// Child flow files, only populated for FORK events
    #[serde(default, deserialize_with = "nullable")]
    pub child_ids: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub platform: String,

    #[serde(default, deserialize_with = "nullable")]
    pub application: String,

    #[serde(default, deserialize_with = "nullable")]
    pub remote_identifier: String,

    #[serde(default, deserialize_with = "nullable")]
    pub alternate_identifier: String,

    #[serde(default, deserialize_with = "nullable")]
    pub transit_uri: String,
}

/// Provenance event type
///
/// Unrecognised literals on the wire decode to [`ProvenanceEventType::Unknown`];
/// [`FromStr`] is strict and is what configuration goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvenanceEventType {
    #[serde(rename = "ADDINFO")]
    AddInfo,
    #[serde(rename = "ATTRIBUTES_MODIFIED")]
    AttributesModified,
    #[serde(rename = "CLONE")]
    Clone,
    #[serde(rename = "CONTENT_MODIFIED")]
    ContentModified,
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "DOWNLOAD")]
    Download,
    #[serde(rename = "DROP")]
    Drop,
    #[serde(rename = "EXPIRE")]
    Expire,
    #[serde(rename = "FETCH")]
    Fetch,
    #[serde(rename = "FORK")]
    Fork,
    #[serde(rename = "JOIN")]
    Join,
    #[serde(rename = "RECEIVE")]
    Receive,
    #[serde(rename = "REMOTE_INVOCATION")]
    RemoteInvocation,
    #[serde(rename = "REPLAY")]
    Replay,
    #[serde(rename = "ROUTE")]
    Route,
    #[serde(rename = "SEND")]
    Send,
    #[default]
    #[serde(rename = "UNKNOWN", other)]
    Unknown,
}

impl ProvenanceEventType {
    /// All event types, in wire-literal order
    pub const ALL: [ProvenanceEventType; 17] = [
        Self::AddInfo,
        Self::AttributesModified,
        Self::Clone,
        Self::ContentModified,
        Self::Create,
        Self::Download,
        Self::Drop,
        Self::Expire,
        Self::Fetch,
        Self::Fork,
        Self::Join,
        Self::Receive,
        Self::RemoteInvocation,
        Self::Replay,
        Self::Route,
        Self::Send,
        Self::Unknown,
    ];

    /// Wire literal for this event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddInfo => "ADDINFO",
            Self::AttributesModified => "ATTRIBUTES_MODIFIED",
            Self::Clone => "CLONE",
            Self::ContentModified => "CONTENT_MODIFIED",
            Self::Create => "CREATE",
            Self::Download => "DOWNLOAD",
            Self::Drop => "DROP",
            Self::Expire => "EXPIRE",
            Self::Fetch => "FETCH",
            Self::Fork => "FORK",
            Self::Join => "JOIN",
            Self::Receive => "RECEIVE",
            Self::RemoteInvocation => "REMOTE_INVOCATION",
            Self::Replay => "REPLAY",
            Self::Route => "ROUTE",
            Self::Send => "SEND",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProvenanceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a literal is not a known provenance event type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown provenance event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for ProvenanceEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(literal))
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Treats an explicit JSON `null` the same as a missing field
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
