#![deny(missing_docs)]

//! # OAS Resolver
//!
//! Reference resolution for OpenAPI documents: finds every `$ref`, follows it
//! across documents, classifies circular references, and optionally inlines
//! each reference with a deep copy of its target.

/// Shared error types.
pub mod error;

/// Positional document tree.
pub mod document;

/// Reference catalogue and multi-document lookup.
pub mod index;

/// Journeys, cycle classification and inlining.
pub mod resolver;

pub use document::{Document, NodeId, Position};
pub use error::{AppError, AppResult};
pub use index::{DocumentId, DocumentRegistry, IndexConfig, Reference, SpecIndex, Target};
pub use resolver::{
    is_tolerable, partition_errors, CircularReferenceResult, ResolveFailure, Resolver,
    ResolverConfig, ResolverStats, ResolvingError,
};
