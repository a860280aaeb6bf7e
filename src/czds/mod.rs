//! Client side of the zone-data service: the link list, per-zone
//! request validation and the header metadata both GET and HEAD carry.

pub mod error;
pub mod list;
pub mod metadata;
pub mod zone;

pub use error::{FetchError, ListError};
pub use list::ZoneTarget;
pub use metadata::ZoneMetadata;
