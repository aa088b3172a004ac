//! reco-store: single-file transactional metadata store
//!
//! All records live in one JSON document ([`Tables`]). Readers see the last
//! committed state; a single writer at a time mutates a private working copy
//! through a [`Transaction`], which is persisted atomically (temp + rename)
//! on commit and discarded on drop.

pub mod boxes;
pub mod query;
pub mod store;
pub mod tags;

pub use boxes::{BoxChange, BoxTarget};
pub use query::{OrderBy, RecoQuery};
pub use reco_core::model::diff_tags;
pub use store::{MetadataStore, Tables, Transaction};
