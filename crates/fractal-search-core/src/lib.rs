//! # Fractal Search Core
//!
//! Shared logic for Fractal Search: the document model, the recursive
//! similarity partitioner that assigns hierarchical labels, the search
//! backend abstraction, and the search algorithm that runs on top of it.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Concrete backends that need those live in
//! the `fractal-search` app crate.
//!
//! # Flow
//!
//! 1. Raw `(id, text)` pairs become [`document::Document`]s.
//! 2. [`partition::compute_labels`] splits the set into a binary tree and
//!    returns a [`partition::LabelMapping`] (`id → "root.0.1"`).
//! 3. [`pipeline::label_and_index`] attaches the labels and writes the
//!    triples to a [`store::SearchBackend`].
//! 4. [`search::search`] queries the backend, optionally filtered by an
//!    exact label.

pub mod document;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod search;
pub mod similarity;
pub mod store;

pub use error::{Error, Result};
