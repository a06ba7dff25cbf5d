//! # MDS Harness
//!
//! Builds a Melvil decimal (Dewey-style) taxonomy by crawling a reference
//! site, and classifies free-text queries against it by asking a language
//! model to pick one class per level.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │ PageSource  │──▶│ TreeBuilder │──▶│  JSON    │
//! │ HTTP/listing│   │  Registry   │   │ taxonomy │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌───────────┐
//!                 │ Descent  │◀─────▶│  Oracle   │
//!                 │ classify │       │ LLM judge │
//!                 └──────────┘       └───────────┘
//! ```
//!
//! The build phase owns the only mutable tree; classification works on
//! the persisted, read-only result.
//!
//! ## Quick Start
//!
//! ```bash
//! mds build                         # crawl and write data/mds.json
//! mds stats                         # sanity-check the taxonomy
//! mds classify "dog breeding"       # stream descent updates as JSON lines
//! mds documents > docs.jsonl        # breadcrumb documents for indexing
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`number`] | Number canonicalization and ancestor candidates |
//! | [`registry`] | Build-time node arena keyed by canonical number |
//! | [`listing`] | Listing page parser |
//! | [`source`] | Page fetching |
//! | [`builder`] | Concurrent tree crawl |
//! | [`persist`] | Sorted JSON persistence |
//! | [`classify`] | Level-by-level descent classification |
//! | [`oracle`] | Language-model oracles |
//! | [`documents`] | Breadcrumb documents for semantic search |
//! | [`stats`] | Taxonomy statistics |
//! | [`progress`] | Build progress reporting |
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |

pub mod builder;
pub mod classify;
pub mod config;
pub mod documents;
pub mod listing;
pub mod models;
pub mod number;
pub mod oracle;
pub mod persist;
pub mod progress;
pub mod registry;
pub mod source;
pub mod stats;
