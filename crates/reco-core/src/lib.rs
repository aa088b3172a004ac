//! reco-core: data model, configuration, and error taxonomy shared by every
//! reco crate.

pub mod config;
pub mod error;
pub mod mime;
pub mod model;

pub use error::{ErrorKind, RecoError, RecoResult};
pub use model::{Reco, RecoBox, RecoType, Tag};
