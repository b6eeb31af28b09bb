//! Map tile sources.
//!
//! The OpenStreetMap base map and the NEXRAD radar overlay, both as
//! `walkers` tile sources so a renderer can consume them directly.

pub mod nexrad;
pub mod osm;

pub use nexrad::NexradRadarSource;
pub use osm::OpenStreetMapSource;
