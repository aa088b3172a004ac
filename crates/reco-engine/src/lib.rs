//! reco-engine: the storage engine orchestrating crypto, metadata, and cloud
//!
//! Lifecycle:
//! ```text
//! Uninitialized ──create_account──► Locked ──login──► Unlocked ──setup_cloud──► Ready
//!                                     ▲                  │                       │
//!                                     └──────logout──────┴───────────────────────┘
//! ```
//! `login` goes straight to Ready when an encrypted cloud settings file is
//! already on disk.

pub mod account;
pub mod blobs;
pub mod cache;
pub mod engine;
pub mod records;
pub mod session;
pub mod thumbnail;

pub use cache::BlobCache;
pub use engine::Engine;
pub use records::RecoUpdate;
pub use session::EngineState;
pub use thumbnail::{jpeg_thumbnailer, ThumbnailFn};

pub use reco_storage::CloudSettings;
pub use reco_store::{BoxChange, BoxTarget, OrderBy, RecoQuery};
