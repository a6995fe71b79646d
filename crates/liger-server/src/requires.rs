//! Resolution of `require "..."` paths.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use liger_core::Range;
use regex::Regex;

static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*require\s+"([^"]*)""#).expect("require pattern"));

/// Classification of a require target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireKind {
    /// `./` or `../` relative to the requiring file
    Relative,
    /// Found under `<root>/lib/<shard>/src`
    Shard,
    /// Anything else: standard library or an unresolved shard
    StdlibOrUnknown,
}

impl RequireKind {
    pub fn describe(&self) -> &'static str {
        match self {
            RequireKind::Relative => "Relative require",
            RequireKind::Shard => "Shard dependency",
            RequireKind::StdlibOrUnknown => "Standard library or unknown shard",
        }
    }
}

/// A resolved require statement.
#[derive(Debug, Clone)]
pub struct ResolvedRequire {
    pub raw: String,
    pub kind: RequireKind,
    /// The file the path resolves to, when one exists on disk.
    pub path: Option<PathBuf>,
}

/// If `line` is a require statement and `character` falls inside the
/// quoted path, return the path text and the range of the quoted region.
pub fn require_at(line: &str, line_no: u32, character: u32) -> Option<(String, Range)> {
    let caps = REQUIRE_RE.captures(line)?;
    let group = caps.get(1)?;

    // Character offsets equal byte offsets here only for ASCII; count
    // chars to stay honest with multibyte paths.
    let start = line[..group.start()].chars().count() as u32;
    let end = line[..group.end()].chars().count() as u32;
    let range = Range::on_line(line_no, start.saturating_sub(1), end + 1);
    if character < range.start.character || character > range.end.character {
        return None;
    }
    Some((group.as_str().to_string(), range))
}

/// Resolve a require path against the requiring file and workspace root.
pub fn resolve_require(root: &Path, current_file: Option<&Path>, target: &str) -> ResolvedRequire {
    if target.starts_with("./") || target.starts_with("../") {
        let path = current_file
            .and_then(|f| f.parent())
            .and_then(|base| resolve_relative(base, target));
        return ResolvedRequire {
            raw: target.to_string(),
            kind: RequireKind::Relative,
            path,
        };
    }

    // Shard requires name the shard, optionally with a subpath
    let first_segment = target.split('/').next().unwrap_or(target);
    let shard_src = root.join("lib").join(first_segment).join("src");
    if shard_src.is_dir() {
        let candidates = [
            shard_src.join(format!("{target}.cr")),
            shard_src.join(target).join(format!("{first_segment}.cr")),
            shard_src.join(format!("{first_segment}.cr")),
        ];
        for candidate in candidates {
            if candidate.is_file() {
                return ResolvedRequire {
                    raw: target.to_string(),
                    kind: RequireKind::Shard,
                    path: Some(candidate),
                };
            }
        }
        return ResolvedRequire {
            raw: target.to_string(),
            kind: RequireKind::Shard,
            path: None,
        };
    }

    ResolvedRequire {
        raw: target.to_string(),
        kind: RequireKind::StdlibOrUnknown,
        path: None,
    }
}

/// `./x` → `x.cr`, or a directory require `./x` → `x/x.cr`.
fn resolve_relative(base: &Path, target: &str) -> Option<PathBuf> {
    let joined = base.join(target);
    let with_ext = if joined.extension().is_some() {
        joined.clone()
    } else {
        joined.with_extension("cr")
    };
    if with_ext.is_file() {
        return Some(with_ext);
    }
    let stem = joined.file_name()?.to_string_lossy().into_owned();
    let nested = joined.join(format!("{stem}.cr"));
    nested.is_file().then_some(nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_require_at_detects_cursor_in_quotes() {
        let line = "require \"json\"";
        let (path, range) = require_at(line, 0, 10).unwrap();
        assert_eq!(path, "json");
        assert_eq!(range.start.line, 0);

        // Cursor on the keyword itself is outside the quoted region
        assert!(require_at(line, 0, 2).is_none());
        // Not a require line at all
        assert!(require_at("x = \"json\"", 0, 7).is_none());
    }

    #[test]
    fn test_relative_require_resolution() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/util.cr"), "").unwrap();
        let current = dir.path().join("src/main.cr");

        let resolved = resolve_require(dir.path(), Some(&current), "./util");
        assert_eq!(resolved.kind, RequireKind::Relative);
        assert_eq!(resolved.path.unwrap(), dir.path().join("src/util.cr"));
    }

    #[test]
    fn test_relative_directory_require() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/models")).unwrap();
        fs::write(dir.path().join("src/models/models.cr"), "").unwrap();
        let current = dir.path().join("src/main.cr");

        let resolved = resolve_require(dir.path(), Some(&current), "./models");
        assert_eq!(resolved.path.unwrap(), dir.path().join("src/models/models.cr"));
    }

    #[test]
    fn test_shard_require_resolution() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/kemal/src")).unwrap();
        fs::write(dir.path().join("lib/kemal/src/kemal.cr"), "").unwrap();

        let resolved = resolve_require(dir.path(), None, "kemal");
        assert_eq!(resolved.kind, RequireKind::Shard);
        assert_eq!(
            resolved.path.unwrap(),
            dir.path().join("lib/kemal/src/kemal.cr")
        );
    }

    #[test]
    fn test_unknown_require_is_stdlib_class() {
        let dir = tempdir().unwrap();
        let resolved = resolve_require(dir.path(), None, "json");
        assert_eq!(resolved.kind, RequireKind::StdlibOrUnknown);
        assert!(resolved.path.is_none());
    }
}
