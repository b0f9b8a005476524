//! Persistence implementations
//!
//! File-based implementations of the repository traits. Each store keeps
//! its records in memory behind a `Mutex` and rewrites its JSON file after
//! every change.

mod file_pending_queue;
mod file_spec_registry;
mod file_weigh_result_repo;
mod json_file;

pub use file_pending_queue::FilePendingQueue;
pub use file_spec_registry::FileSpecRegistry;
pub use file_weigh_result_repo::FileWeighResultRepository;
