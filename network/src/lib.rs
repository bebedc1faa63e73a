//! Region-to-region latency and bandwidth model (component B). Regions are
//! opaque indices; the tables that relate them to real-world geography are
//! an external collaborator's concern, not this crate's.

mod model;

pub use model::{LatencyParams, NetworkError, NetworkModel, RegionParams};
