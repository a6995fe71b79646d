//! Out-of-process Crystal compiler bridge.
//!
//! The compiler is consulted read-only through `crystal tool
//! implementations`, `crystal tool context`, and `crystal env`. Every
//! failure mode (missing binary, non-zero exit, unparseable output)
//! degrades to "no answer"; the callers fall back to local resolution.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::paths;

/// How long a discovered main file stays cached.
const MAIN_FILE_TTL: Duration = Duration::from_secs(5);

/// A resolved `file:line:col` triple from the compiler, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

/// Interface to the Crystal compiler tools.
///
/// The default implementation forks `crystal`; tests substitute a double.
pub trait CompilerOracle {
    /// `crystal tool implementations -c file:line:col [main]`
    fn implementations(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        main: Option<&Path>,
    ) -> Vec<SourceLocation>;

    /// `crystal tool context -c file:line:col [main]`; opaque type-info
    /// text, or `None` when the tool has nothing useful.
    fn context(&self, file: &Path, line: u32, column: u32, main: Option<&Path>) -> Option<String>;

    /// Candidate stdlib roots from `crystal env CRYSTAL_PATH`.
    fn stdlib_roots(&self) -> Vec<PathBuf>;
}

/// The production oracle: a `crystal` subprocess per query.
#[derive(Debug, Default)]
pub struct CrystalOracle;

impl CrystalOracle {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let output = match Command::new("crystal").args(args).output() {
            Ok(output) => output,
            Err(error) => {
                debug!("crystal not invocable: {error}");
                return None;
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                "crystal {} exited with {}: {}",
                args.first().unwrap_or(&""),
                output.status,
                stderr.trim()
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CompilerOracle for CrystalOracle {
    fn implementations(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        main: Option<&Path>,
    ) -> Vec<SourceLocation> {
        let cursor = format!("{}:{}:{}", file.display(), line, column);
        let mut args = vec!["tool", "implementations", "-c", cursor.as_str()];
        let main_text;
        if let Some(main) = main {
            main_text = main.display().to_string();
            args.push(&main_text);
        }

        let stdout = match self.run(&args) {
            Some(stdout) => stdout,
            None => return Vec::new(),
        };
        stdout.lines().filter_map(parse_location).collect()
    }

    fn context(&self, file: &Path, line: u32, column: u32, main: Option<&Path>) -> Option<String> {
        let cursor = format!("{}:{}:{}", file.display(), line, column);
        let mut args = vec!["tool", "context", "-c", cursor.as_str()];
        let main_text;
        if let Some(main) = main {
            main_text = main.display().to_string();
            args.push(&main_text);
        }

        let stdout = self.run(&args)?;
        let trimmed = stdout.trim();
        if trimmed.is_empty()
            || trimmed.contains("Error")
            || trimmed.contains("Usage:")
            || trimmed.contains("no context")
        {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn stdlib_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(stdout) = self.run(&["env", "CRYSTAL_PATH"]) {
            let separator = if cfg!(windows) { ';' } else { ':' };
            for piece in stdout.trim().split(separator) {
                let candidate = PathBuf::from(piece.trim());
                if looks_like_stdlib(&candidate) {
                    roots.push(candidate);
                }
            }
        }
        if roots.is_empty() {
            for fallback in [
                "/usr/share/crystal/src",
                "/usr/local/share/crystal/src",
                "/opt/homebrew/share/crystal/src",
                "/usr/lib/crystal/src",
            ] {
                let candidate = PathBuf::from(fallback);
                if looks_like_stdlib(&candidate) {
                    roots.push(candidate);
                    break;
                }
            }
        }
        roots
    }
}

/// An oracle that never answers. Used when the compiler is unavailable
/// and as the base for test doubles.
#[derive(Debug, Default)]
pub struct NullOracle;

impl CompilerOracle for NullOracle {
    fn implementations(
        &self,
        _file: &Path,
        _line: u32,
        _column: u32,
        _main: Option<&Path>,
    ) -> Vec<SourceLocation> {
        Vec::new()
    }

    fn context(&self, _file: &Path, _line: u32, _column: u32, _main: Option<&Path>) -> Option<String> {
        None
    }

    fn stdlib_roots(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// A stdlib root holds `prelude.cr` or `object.cr` directly.
fn looks_like_stdlib(candidate: &Path) -> bool {
    candidate.join("prelude.cr").is_file() || candidate.join("object.cr").is_file()
}

/// Parse one `file:line:col` line from tool output. Splits from the right
/// so Windows drive colons survive.
fn parse_location(line: &str) -> Option<SourceLocation> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let mut pieces = line.rsplitn(3, ':');
    let column: u32 = pieces.next()?.parse().ok()?;
    let row: u32 = pieces.next()?.parse().ok()?;
    let file = pieces.next()?;
    if file.is_empty() {
        return None;
    }
    Some(SourceLocation {
        file: PathBuf::from(file),
        line: row,
        column,
    })
}

/// Discovers and caches the project's compilation entry point.
///
/// `shard.yml` is consulted first (`targets.*.main`, first entry naming an
/// existing file), then conventional locations.
#[derive(Debug)]
pub struct MainFileCache {
    root: PathBuf,
    cached: Option<(Option<PathBuf>, Instant)>,
}

impl MainFileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cached: None,
        }
    }

    /// The main file, if any, refreshed after the TTL.
    pub fn get(&mut self) -> Option<PathBuf> {
        if let Some((value, at)) = &self.cached {
            if at.elapsed() < MAIN_FILE_TTL {
                return value.clone();
            }
        }
        let discovered = self.discover();
        self.cached = Some((discovered.clone(), Instant::now()));
        discovered
    }

    /// Drop the cached value.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn discover(&self) -> Option<PathBuf> {
        if let Some(main) = self.main_from_shard_yml() {
            return Some(main);
        }

        let basename = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for candidate in [
            self.root.join("src").join(format!("{basename}.cr")),
            self.root.join("src").join("main.cr"),
            self.root.join("main.cr"),
        ] {
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Minimal extraction of `targets.*.main` from shard.yml: a top-level
    /// `targets:` key, one nesting level of target names, `main:` values
    /// below them, in file order.
    fn main_from_shard_yml(&self) -> Option<PathBuf> {
        let content = std::fs::read_to_string(self.root.join("shard.yml")).ok()?;

        let mut in_targets = false;
        for line in content.lines() {
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
                continue;
            }
            let indent = trimmed.len() - trimmed.trim_start().len();

            if indent == 0 {
                in_targets = trimmed == "targets:";
                continue;
            }
            if !in_targets {
                continue;
            }
            let body = trimmed.trim_start();
            if let Some(value) = body.strip_prefix("main:") {
                let rel = value.trim().trim_matches(['"', '\'']);
                if rel.is_empty() {
                    continue;
                }
                let path = self.root.join(rel);
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        None
    }
}

/// Writes in-memory document text to disk before oracle calls, gated on a
/// content hash per URI so unchanged text never touches the file.
#[derive(Debug, Default)]
pub struct SourceFlusher {
    written: FxHashMap<String, u64>,
}

impl SourceFlusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush `text` to the file backing `uri` when its hash differs from
    /// the last write. Returns the filesystem path when the file is
    /// usable for a compiler invocation.
    pub fn sync(&mut self, uri: &str, text: &str) -> Option<PathBuf> {
        let path = paths::uri_to_path(uri)?;

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let digest = hasher.finish();

        if self.written.get(uri) == Some(&digest) {
            return Some(path);
        }

        match std::fs::write(&path, text) {
            Ok(()) => {
                self.written.insert(uri.to_string(), digest);
                Some(path)
            }
            Err(error) => {
                warn!("cannot sync {} to disk: {error}", path.display());
                // The on-disk copy may still be close enough for the tool
                path.exists().then_some(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_location() {
        let loc = parse_location("/src/app.cr:12:5").unwrap();
        assert_eq!(loc.file, PathBuf::from("/src/app.cr"));
        assert_eq!(loc.line, 12);
        assert_eq!(loc.column, 5);

        // Windows drive colon survives the split
        let loc = parse_location(r"C:\code\app.cr:3:1").unwrap();
        assert_eq!(loc.file, PathBuf::from(r"C:\code\app.cr"));

        assert!(parse_location("").is_none());
        assert!(parse_location("not a location").is_none());
        assert!(parse_location("file.cr:x:y").is_none());
    }

    #[test]
    fn test_main_file_from_shard_yml() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/cli.cr"), "").unwrap();
        fs::write(
            dir.path().join("shard.yml"),
            "name: tool\n\ntargets:\n  tool:\n    main: src/cli.cr\n  other:\n    main: src/other.cr\n",
        )
        .unwrap();

        let mut cache = MainFileCache::new(dir.path());
        assert_eq!(cache.get().unwrap(), dir.path().join("src/cli.cr"));
    }

    #[test]
    fn test_main_file_skips_missing_target() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/second.cr"), "").unwrap();
        fs::write(
            dir.path().join("shard.yml"),
            "targets:\n  gone:\n    main: src/gone.cr\n  here:\n    main: src/second.cr\n",
        )
        .unwrap();

        let mut cache = MainFileCache::new(dir.path());
        assert_eq!(cache.get().unwrap(), dir.path().join("src/second.cr"));
    }

    #[test]
    fn test_main_file_conventional_fallbacks() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.cr"), "").unwrap();

        let mut cache = MainFileCache::new(dir.path());
        assert_eq!(cache.get().unwrap(), dir.path().join("src/main.cr"));

        // Cached value returned without re-discovery inside the TTL
        fs::remove_file(dir.path().join("src/main.cr")).unwrap();
        assert!(cache.get().is_some());

        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_source_flusher_writes_once_per_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.cr");
        fs::write(&path, "stale").unwrap();
        let uri = paths::path_to_uri(&path);

        let mut flusher = SourceFlusher::new();
        assert_eq!(flusher.sync(&uri, "fresh").unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");

        // Same content: the write is skipped (observable by mutating the
        // file behind the flusher's back)
        fs::write(&path, "mutated").unwrap();
        assert_eq!(flusher.sync(&uri, "fresh").unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "mutated");

        // New content: written again
        assert_eq!(flusher.sync(&uri, "newer").unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "newer");
    }

    #[test]
    fn test_source_flusher_rejects_non_file_uri() {
        let mut flusher = SourceFlusher::new();
        assert!(flusher.sync("untitled:Untitled-1", "x").is_none());
    }
}
