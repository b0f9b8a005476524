//! Infrastructure layer: JSON-file repositories and data loaders

pub mod persistence;
pub mod readings_csv;
pub mod registry_loader;

pub use persistence::{FilePendingQueue, FileSpecRegistry, FileWeighResultRepository};
pub use readings_csv::ReadingsImport;
pub use registry_loader::RegistrySeed;
