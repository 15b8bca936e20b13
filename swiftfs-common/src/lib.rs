//! The generic filesystem contract shared by swiftfs adapters: the
//! [`FilesystemAdapter`] trait, file attributes, per-call configuration,
//! the error taxonomy and path prefixing.

pub mod attributes;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod mime;
pub mod path;

pub use attributes::{FileAttributes, Visibility};
pub use config::Config;
pub use error::{BoxError, FilesystemError, MetadataField, MoveStage};
pub use filesystem::{read_to_bytes, AttributeStream, ByteStream, FilesystemAdapter, Payload};
pub use mime::MimeTypeDetector;
pub use path::{normalize_path, PathPrefixer};

pub type Result<T> = std::result::Result<T, FilesystemError>;
