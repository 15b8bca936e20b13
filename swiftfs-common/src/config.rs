use serde::Deserialize;

/// Objects larger than this are uploaded in segments (300 MiB).
pub const DEFAULT_LARGE_OBJECT_THRESHOLD: u64 = 314_572_800;
/// Size of each segment of a large object (100 MiB).
pub const DEFAULT_SEGMENT_SIZE: u64 = 104_857_600;

/// Per-operation overrides passed to write and move calls.
///
/// Keys match the names callers already use in JSON or TOML option maps,
/// e.g. `{"swiftSegmentSize": 1048576}`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub swift_large_object_threshold: Option<u64>,
    #[serde(default)]
    pub swift_segment_size: Option<u64>,
    #[serde(default)]
    pub swift_segment_container: Option<String>,
}

impl Config {
    pub fn large_object_threshold(&self) -> u64 {
        self.swift_large_object_threshold
            .unwrap_or(DEFAULT_LARGE_OBJECT_THRESHOLD)
    }

    pub fn segment_size(&self) -> u64 {
        self.swift_segment_size.unwrap_or(DEFAULT_SEGMENT_SIZE)
    }

    /// Segment container, falling back to the container the adapter is bound to.
    pub fn segment_container<'a>(&'a self, default_container: &'a str) -> &'a str {
        self.swift_segment_container
            .as_deref()
            .unwrap_or(default_container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.large_object_threshold(), 300 * 1024 * 1024);
        assert_eq!(config.segment_size(), 100 * 1024 * 1024);
        assert_eq!(config.segment_container("files"), "files");
    }

    #[test]
    fn test_parse_camel_case_keys() {
        let json = r#"{
            "swiftLargeObjectThreshold": 10,
            "swiftSegmentSize": 4,
            "swiftSegmentContainer": "files_segments"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.large_object_threshold(), 10);
        assert_eq!(config.segment_size(), 4);
        assert_eq!(config.segment_container("files"), "files_segments");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str("swiftSegmentSize = 2048").unwrap();
        assert_eq!(config.segment_size(), 2048);
        assert_eq!(config.swift_large_object_threshold, None);
    }
}
