pub mod base;
pub mod credentials;
pub mod file_store;
pub mod memory_store;

// Re-export the primary Store items so code outside can do
// "use crate::store::{KeyValueStore, CredentialStore};"
pub use base::{create_durable_store, KeyValueStore};
pub use credentials::CredentialStore;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
