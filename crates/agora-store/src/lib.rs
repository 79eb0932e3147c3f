//! Record store abstraction and data layer for the Agora economy
//! simulation.
//!
//! The orchestration core sees persistence only through the [`RecordStore`]
//! trait: create / read / update / query-by-filter over agents, locations,
//! resource lots, contracts, activity steps, and campaigns. Filters are
//! field-equality and time-range conjunctions ([`StepQuery`]); the core
//! composes multiple simple queries rather than relying on store-side
//! joins.
//!
//! Two backends live here:
//!
//! - [`MemoryStore`] -- the authoritative in-memory store for a run,
//!   deterministic and cheaply cloneable for dry-run ticks.
//! - [`PostgresArchive`] -- async durable history of terminal steps and
//!   campaign snapshots, batch-written with UNNEST inserts.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::{ArchivedStepRow, PostgresArchive};
pub use query::StepQuery;
pub use store::RecordStore;
