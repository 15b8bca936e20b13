//! Error taxonomy for filesystem adapter operations.
//!
//! Every failed operation maps to exactly one [`FilesystemError`] kind.
//! Adapters translate backend failures once, at the call site closest to
//! the remote request, and never retry.

use std::fmt;

/// Boxed underlying cause carried by most error kinds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which metadata field a failed metadata lookup was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    MimeType,
    LastModified,
    FileSize,
    Visibility,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataField::MimeType => "mimeType",
            MetadataField::LastModified => "lastModified",
            MetadataField::FileSize => "fileSize",
            MetadataField::Visibility => "visibility",
        };
        f.write_str(name)
    }
}

/// The step of a move at which it failed.
///
/// A move is a server-side copy followed by a delete of the source. A
/// failure at [`MoveStage::DeleteSource`] means the destination was
/// written and the source is still present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStage {
    Copy,
    DeleteSource,
}

impl fmt::Display for MoveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveStage::Copy => f.write_str("copy"),
            MoveStage::DeleteSource => f.write_str("delete of source after copy"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilesystemError {
    #[error("Unable to write file at location: {path}")]
    UnableToWriteFile {
        path: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to read file from location: {path}")]
    UnableToReadFile {
        path: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to check existence for: {path}")]
    UnableToCheckFileExistence {
        path: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to retrieve the {field} for file at location: {path}. {reason}")]
    UnableToRetrieveMetadata {
        path: String,
        field: MetadataField,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to delete file located at: {path}. {reason}")]
    UnableToDeleteFile {
        path: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to delete directory located at: {path}. {reason}")]
    UnableToDeleteDirectory { path: String, reason: String },

    #[error("Unable to move file from {from} to {to} (failed at {stage})")]
    UnableToMoveFile {
        from: String,
        to: String,
        stage: MoveStage,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to copy file from {from} to {to}. {reason}")]
    UnableToCopyFile {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Unable to set visibility for file {path}. {reason}")]
    UnableToSetVisibility { path: String, reason: String },

    #[error("Unable to list contents for '{path}'")]
    UnableToListContents {
        path: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unable to generate temporary url for file at location: {path}. {reason}")]
    UnableToGenerateTemporaryUrl { path: String, reason: String },

    #[error("Path traversal detected: {path}")]
    PathTraversalDetected { path: String },
}

impl FilesystemError {
    pub fn unable_to_write(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UnableToWriteFile {
            path: path.into(),
            source: Some(source.into()),
        }
    }

    pub fn unable_to_read(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UnableToReadFile {
            path: path.into(),
            source: Some(source.into()),
        }
    }

    pub fn unable_to_check_existence(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UnableToCheckFileExistence {
            path: path.into(),
            source: Some(source.into()),
        }
    }

    pub fn unable_to_retrieve_metadata(
        path: impl Into<String>,
        field: MetadataField,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        Self::UnableToRetrieveMetadata {
            path: path.into(),
            field,
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn unable_to_delete(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::UnableToDeleteFile {
            path: path.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// The logical path the failed operation was addressed to.
    ///
    /// For moves and copies this is the source path.
    pub fn path(&self) -> &str {
        match self {
            Self::UnableToWriteFile { path, .. }
            | Self::UnableToReadFile { path, .. }
            | Self::UnableToCheckFileExistence { path, .. }
            | Self::UnableToRetrieveMetadata { path, .. }
            | Self::UnableToDeleteFile { path, .. }
            | Self::UnableToDeleteDirectory { path, .. }
            | Self::UnableToSetVisibility { path, .. }
            | Self::UnableToListContents { path, .. }
            | Self::UnableToGenerateTemporaryUrl { path, .. }
            | Self::PathTraversalDetected { path } => path,
            Self::UnableToMoveFile { from, .. } | Self::UnableToCopyFile { from, .. } => from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_metadata_error_carries_field_and_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "HTTP 500");
        let err = FilesystemError::unable_to_retrieve_metadata("a/b.txt", MetadataField::MimeType, cause);
        assert_eq!(
            err.to_string(),
            "Unable to retrieve the mimeType for file at location: a/b.txt. HTTP 500"
        );
        assert!(err.source().is_some());
        assert_eq!(err.path(), "a/b.txt");
    }

    #[test]
    fn test_move_error_reports_stage() {
        let err = FilesystemError::UnableToMoveFile {
            from: "a".into(),
            to: "b".into(),
            stage: MoveStage::DeleteSource,
            source: None,
        };
        assert!(err.to_string().contains("delete of source after copy"));
        assert_eq!(err.path(), "a");
    }
}
