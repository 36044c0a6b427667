//! NiFi reporting-task event types
//!
//! Both record kinds arrive as flat JSON arrays from the NiFi site-to-site
//! reporting tasks. Every field is optional on the wire.

pub mod bulletin;
pub mod provenance;

pub use bulletin::*;
pub use provenance::*;
