//! Scope Tree - Universal name binding model
//!
//! Frontends drive a `ScopeManager` with enter/declare/leave events while
//! walking a translation unit. The resulting tree of scopes answers name,
//! reference and type queries, and per-unit managers are merged into one
//! before the global resolution pass.

pub mod graph;
pub mod manager;
pub mod merge;
pub mod resolver;

pub use graph::{JumpTargets, Scope, ScopeId, ScopeKind};
pub use manager::{ScopeChain, ScopeManager};
pub use merge::MergeStats;
pub use resolver::ResolutionCache;
