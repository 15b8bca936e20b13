//! Best-effort MIME type detection.

/// Guesses a MIME type from a path's extension, falling back to a small
/// set of magic-byte signatures when content is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeTypeDetector;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
];

impl MimeTypeDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, path: &str, contents: Option<&[u8]>) -> Option<String> {
        if let Some(mime) = self.detect_from_path(path) {
            return Some(mime);
        }
        contents.and_then(detect_from_bytes).map(|m| m.to_string())
    }

    pub fn detect_from_path(&self, path: &str) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }
}

fn detect_from_bytes(data: &[u8]) -> Option<&'static str> {
    if data.is_empty() {
        return None;
    }
    for (magic, mime) in SIGNATURES {
        if data.starts_with(magic) {
            return Some(*mime);
        }
    }
    // Treat valid UTF-8 without NUL bytes as text
    let sample = &data[..data.len().min(1024)];
    match std::str::from_utf8(sample) {
        Ok(text) if !text.contains('\0') => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        let detector = MimeTypeDetector::new();
        assert_eq!(detector.detect("a/b.txt", None).as_deref(), Some("text/plain"));
        assert_eq!(detector.detect("photo.JPG", None).as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_detect_by_content() {
        let detector = MimeTypeDetector::new();
        assert_eq!(
            detector.detect("blob", Some(&b"\x89PNG\r\n\x1a\n...."[..])).as_deref(),
            Some("image/png")
        );
        assert_eq!(detector.detect("notes", Some(&b"hello"[..])).as_deref(), Some("text/plain"));
        assert_eq!(detector.detect("raw", Some(&[0u8, 1, 2, 0xff][..])), None);
        assert_eq!(detector.detect("raw", None), None);
    }
}
