//! # ctxfuse-db
//!
//! Infrastructure layer for ctxfuse - hybrid vector storage.
//!
//! This crate provides the vector index collaborator that the retrieval engine
//! in `ctxfuse-core` queries. Keeping it separate means:
//!
//! - The engine depends only on the [`vector::VectorIndexBackend`] trait
//! - Backends can be swapped without changing domain logic
//! - Tests run against the in-memory backend with no network
//!
//! ## Architecture
//!
//! ```text
//! caller → ctxfuse-core → (traits)
//!              ↑
//!          ctxfuse-db (hybrid vector index backends)
//!          ctxfuse-model (dense embedding clients)
//! ```
//!
//! ## Features
//!
//! - `remote` (default): Pinecone-compatible REST backend
//!
//! The in-memory backend is always available.

pub mod error;
pub mod vector;

pub use error::{DbError, DbResult};
