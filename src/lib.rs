//! # cpgscope - Scope and symbol resolution for a code property graph
//!
//! Language-agnostic scope tree, name resolution and call resolution over
//! nodes produced by per-language frontends.
//!
//! cpgscope provides:
//! - A type algebra with implicit casts and inheritance-aware common types
//! - A scope tree built while a frontend walks each translation unit
//! - Unqualified, qualified and alias-aware name resolution
//! - Overload resolution with default arguments and dynamic dispatch
//! - Parallel per-unit processing merged into one tree

pub mod call;
pub mod config;
pub mod diagnostic;
pub mod frontend;
pub mod language;
pub mod linker;
pub mod name;
pub mod node;
pub mod pipeline;
pub mod scope;
pub mod types;
pub mod ui;

// Re-exports for convenient access
pub use call::{CallResolutionKind, CallResolutionResult, CallResolver};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use language::{Language, LanguageRegistry, default_registry};
pub use linker::{Linker, LinkerStats};
pub use name::Name;
pub use node::{Node, NodeId, NodeKind};
pub use pipeline::{Pipeline, PipelineOutput};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeManager};
pub use types::{Type, TypeHierarchy};

/// Result type alias for cpgscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cpgscope operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Type parse error: {0}")]
    TypeParse(String),

    #[error("Malformed event stream: {0}")]
    Event(String),

    #[error("Worker error: {0}")]
    Worker(String),
}
