//! Bulletin events - operational log/alert records

use super::provenance::nullable;
use serde::{Deserialize, Serialize};

/// Wire format of `bulletinTimestamp` (`yyyy-MM-dd'T'HH:mm:ss.SSS'Z'`)
pub const BULLETIN_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// A single bulletin as emitted by the NiFi bulletin reporting task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletinEvent {
    #[serde(default, deserialize_with = "nullable")]
    pub object_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub platform: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_id: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_category: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_group_id: String,

    /// Service name the span is grouped under
    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_group_name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_group_path: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_level: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_message: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_node_address: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_node_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_source_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_source_name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_source_type: String,

    /// See [`BULLETIN_TIMESTAMP_FORMAT`]
    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_timestamp: String,

    #[serde(default, deserialize_with = "nullable")]
    pub bulletin_flow_file_uuid: String,
}
