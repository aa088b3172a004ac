//! reco-storage: OpenDAL-backed object storage for encrypted reco blobs

pub mod object;
pub mod operator;
pub mod settings;

pub use object::ObjectStorage;
pub use operator::build_operator;
pub use settings::CloudSettings;
