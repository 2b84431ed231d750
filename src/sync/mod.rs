//! The live view synchronizer: a per-user mirror of the entry store, kept
//! current by snapshot pushes, with filtered views and the suggestion gate
//! on top.

pub mod filter;
pub mod gate;
pub mod registry;
pub mod session;
pub mod synchronizer;

pub use filter::{derive, CategoryFilter, ViewMode, ViewSelectors};
pub use gate::SuggestionGate;
pub use registry::ViewRegistry;
pub use session::SessionContext;
pub use synchronizer::{LiveView, SyncError, Synchronizer};
