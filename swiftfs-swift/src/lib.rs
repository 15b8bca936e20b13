//! OpenStack Swift implementation of the swiftfs filesystem adapter.

pub mod adapter;
pub mod config;
pub mod store;
pub mod temp_url;

pub use adapter::{DeleteDirOutcome, SwiftAdapter};
pub use config::SwiftConfig;
pub use store::auth::{AuthConfig, Session};
pub use store::memory::MemoryStore;
pub use store::swift::SwiftClient;
pub use store::{ObjectMetadata, ObjectStore, StoreError};
