//! # Fractal Search
//!
//! Hierarchical similarity labelling for short text documents, with
//! label-filtered full-text search.
//!
//! A batch of documents is split recursively into two groups around two
//! seed documents (Jaccard similarity over lowercase word sets) until every
//! group is small enough. Each document gets the dot-path label of the
//! group it ends up in (`root`, `root.0`, `root.1.0`, ...). Documents are
//! stored with their label in a SQLite FTS5 index, and searches can be
//! narrowed to one label.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │   Sources   │──▶│ Partitioner │──▶│  SQLite  │
//! │  JSON / FS  │   │   labels    │   │   FTS5   │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │ (fsearch)│       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fsearch init                          # create database and index
//! fsearch index docs.json               # partition + index a batch
//! fsearch search "python" --label root.0
//! fsearch serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`sources`] | JSON file and filesystem document sources |
//! | [`ingest`] | Labelling and indexing commands |
//! | [`search`] | Label-filtered search command |
//! | [`get`] | Document retrieval |
//! | [`stats`] | Per-label index statistics |
//! | [`server`] | HTTP server |
//! | [`sqlite_backend`] | SQLite FTS5 search backend |
//! | [`db`] | Database connection |
//! | [`migrate`] | Index creation |
//!
//! The partitioning algorithm and the backend trait live in
//! [`fractal_search_core`].

pub mod config;
pub mod db;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sources;
pub mod sqlite_backend;
pub mod stats;
