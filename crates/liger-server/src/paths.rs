//! URI ↔ filesystem path translation.
//!
//! This module is the only place that knows about `file://` prefixes,
//! percent-encoding, Windows drive letters, and separator direction; the
//! rest of the server exchanges already-normalized absolute paths.

use std::path::{Path, PathBuf};

/// Convert a `file://` URI to a filesystem path.
///
/// Returns `None` for non-file URIs. Percent-escapes are decoded, a
/// leading slash before a drive letter (`/C:/...`) is dropped, and
/// separators are converted to the platform's.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri
        .strip_prefix("file://")
        .map(|r| r.strip_prefix("localhost").unwrap_or(r))?;

    let decoded = percent_decode(rest);

    // `/C:/Users/...` → `C:/Users/...`
    let decoded = if is_drive_prefixed(&decoded) {
        decoded[1..].to_string()
    } else {
        decoded
    };

    let native = if std::path::MAIN_SEPARATOR == '\\' {
        decoded.replace('/', "\\")
    } else {
        decoded
    };

    Some(PathBuf::from(native))
}

/// Convert a filesystem path to a `file:///` URI with forward slashes and
/// an encoded drive colon.
pub fn path_to_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let encoded = text.replace(':', "%3A");
    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

fn is_drive_prefixed(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            if let Some(hex) = bytes.get(index + 1..index + 3) {
                if let Ok(value) = u8::from_str_radix(std::str::from_utf8(hex).unwrap_or(""), 16) {
                    out.push(value);
                    index += 3;
                    continue;
                }
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_unix_uri() {
        let path = uri_to_path("file:///home/me/app/src/main.cr").unwrap();
        assert_eq!(path, PathBuf::from("/home/me/app/src/main.cr"));
    }

    #[test]
    fn test_percent_decoding() {
        let path = uri_to_path("file:///home/me/my%20project/a.cr").unwrap();
        assert_eq!(path, PathBuf::from("/home/me/my project/a.cr"));
    }

    #[test]
    fn test_drive_letter_uri() {
        let path = uri_to_path("file:///C%3A/code/app.cr").unwrap();
        if std::path::MAIN_SEPARATOR == '\\' {
            assert_eq!(path, PathBuf::from("C:\\code\\app.cr"));
        } else {
            assert_eq!(path, PathBuf::from("C:/code/app.cr"));
        }
    }

    #[test]
    fn test_non_file_uri_rejected() {
        assert!(uri_to_path("untitled:Untitled-1").is_none());
        assert!(uri_to_path("https://example.com/x.cr").is_none());
    }

    #[test]
    fn test_path_to_uri_encodes_colon() {
        let uri = path_to_uri(Path::new("/home/me/a.cr"));
        assert_eq!(uri, "file:///home/me/a.cr");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_round_trip_native_path() {
        let original = PathBuf::from("/srv/app/src/server.cr");
        let uri = path_to_uri(&original);
        assert_eq!(uri_to_path(&uri).unwrap(), original);
    }
}
