//! Incremental scheduling for live editing.
//!
//! - [`IncrementalState`]: assignments sorted by start, per-resource
//!   interval index, versioned check cache
//! - [`IncrementalSolver`]: add / remove / move / batch / resolve
//! - [`IncrementalBackend`]: full solve built from successive adds

mod cache;
mod solver;
mod state;

pub use cache::{CacheStats, CheckCache, CheckKey};
pub use solver::{
    AddOutcome, BatchOutcome, Change, IncrementalBackend, IncrementalError, IncrementalSolver,
    ResolveOutcome, ResourceMap,
};
pub use state::IncrementalState;
