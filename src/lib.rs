// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod extract;
pub mod ingest;
pub mod normalize;
pub mod scoring;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod weights;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::SeasonSynergyMetrics;
pub use crate::api::{create_router, AppState};
pub use crate::normalize::SynergyLevel;
pub use crate::service::SynergyService;
pub use crate::store::{NormalizedSynergyRecord, RawSynergyRecord, SynergyStore};
pub use crate::weights::SynergyWeights;
