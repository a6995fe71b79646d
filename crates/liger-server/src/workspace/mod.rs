//! Workspace-wide symbol index.
//!
//! Three caches keyed by absolute file path: project sources, shard
//! dependencies under `lib/`, and the Crystal standard library. The
//! project is rescanned on demand with a debounce; `lib/` is scanned
//! once; the stdlib is scanned lazily on the first lookup miss.

mod infer;
mod scanner;

pub use infer::infer_type;
pub use scanner::extract_symbols;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use liger_core::{SymbolInfo, SymbolKind};
use log::{debug, warn};
use regex::Regex;
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::paths;
use crate::utils::indent_of;

/// Repeated rescans within this window are no-ops.
const RESCAN_DEBOUNCE: Duration = Duration::from_secs(5);
/// Depth cap for the project walk.
const PROJECT_SCAN_DEPTH: usize = 10;
/// Depth cap under each `lib/<shard>/src`.
const LIB_SCAN_DEPTH: usize = 3;
/// Depth cap under the stdlib root.
const STDLIB_SCAN_DEPTH: usize = 2;
/// Stdlib subtrees that are compiler internals, not user-facing API.
const STDLIB_DENY: &[&str] = &["compiler", "llvm", "spec", "syntax", "macros", "ecr"];
/// Result cap for workspace/symbol queries.
const SYMBOL_QUERY_LIMIT: usize = 200;

type SymbolCache = FxHashMap<PathBuf, Vec<SymbolInfo>>;

/// The workspace symbol index.
pub struct WorkspaceIndex {
    root: PathBuf,
    workspace_cache: SymbolCache,
    lib_cache: SymbolCache,
    stdlib_cache: SymbolCache,
    last_scan: Option<Instant>,
    lib_scanned: bool,
    stdlib_scanned: bool,
}

impl WorkspaceIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            workspace_cache: FxHashMap::default(),
            lib_cache: FxHashMap::default(),
            stdlib_cache: FxHashMap::default(),
            last_scan: None,
            lib_scanned: false,
            stdlib_scanned: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Invalidate the debounce and refresh one file's symbols in place.
    pub fn update_source(&mut self, uri: &str, content: &str) {
        self.last_scan = None;
        if !uri.ends_with(".cr") {
            return;
        }
        if let Some(path) = paths::uri_to_path(uri) {
            let symbols = extract_symbols(&path, content);
            debug!("reindexed {} ({} symbols)", path.display(), symbols.len());
            self.workspace_cache.insert(path, symbols);
        }
    }

    /// Rescan the project unless a scan completed within the debounce
    /// window. The `lib/` scan runs exactly once.
    pub fn scan_if_needed(&mut self) {
        if let Some(last) = self.last_scan {
            if last.elapsed() < RESCAN_DEBOUNCE {
                return;
            }
        }
        self.scan_project();
        if !self.lib_scanned {
            self.scan_lib();
            self.lib_scanned = true;
        }
        self.last_scan = Some(Instant::now());
    }

    /// Unconditional rescan.
    pub fn force_scan(&mut self) {
        self.last_scan = None;
        self.scan_if_needed();
    }

    fn scan_project(&mut self) {
        let mut cache = SymbolCache::default();
        let walker = WalkDir::new(&self.root)
            .max_depth(PROJECT_SCAN_DEPTH)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                if entry.depth() == 0 {
                    return true;
                }
                if name.starts_with('.') {
                    return false;
                }
                if entry.file_type().is_dir() && (name == "bin" || name == "lib") {
                    return false;
                }
                true
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("workspace scan: {error}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_crystal_file(entry.path()) {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => {
                    cache.insert(
                        entry.path().to_path_buf(),
                        extract_symbols(entry.path(), &content),
                    );
                }
                Err(error) => {
                    warn!("skipping {}: {error}", entry.path().display());
                }
            }
        }

        debug!("project scan indexed {} files", cache.len());
        self.workspace_cache = cache;
    }

    fn scan_lib(&mut self) {
        let lib_dir = self.root.join("lib");
        let entries = match std::fs::read_dir(&lib_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for shard in entries.flatten() {
            let src = shard.path().join("src");
            if !src.is_dir() {
                continue;
            }
            scan_tree_into(&src, LIB_SCAN_DEPTH, &[], &mut self.lib_cache);
        }
        debug!("lib scan indexed {} files", self.lib_cache.len());
    }

    /// Scan the standard library once, using roots discovered by the
    /// caller (compiler env lookup with a fallback list).
    fn ensure_stdlib(&mut self, discover_roots: impl FnOnce() -> Vec<PathBuf>) {
        if self.stdlib_scanned {
            return;
        }
        self.stdlib_scanned = true;

        for root in discover_roots() {
            scan_tree_into(&root, STDLIB_SCAN_DEPTH, STDLIB_DENY, &mut self.stdlib_cache);
        }
        debug!("stdlib scan indexed {} files", self.stdlib_cache.len());
    }

    fn caches(&self) -> [&SymbolCache; 3] {
        [&self.workspace_cache, &self.lib_cache, &self.stdlib_cache]
    }

    /// All indexed symbols, project first.
    pub fn all_symbols(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.caches().into_iter().flat_map(|c| c.values().flatten())
    }

    /// Exact-name lookup across workspace and lib caches, falling back to
    /// the stdlib (scanned lazily on first miss) and then to qualified
    /// name variants.
    pub fn find_symbol_info(
        &mut self,
        name: &str,
        discover_stdlib: impl FnOnce() -> Vec<PathBuf>,
    ) -> Option<SymbolInfo> {
        self.scan_if_needed();

        if let Some(found) = exact_match(&self.workspace_cache, name)
            .or_else(|| exact_match(&self.lib_cache, name))
        {
            return Some(found);
        }

        self.ensure_stdlib(discover_stdlib);
        if let Some(found) = exact_match(&self.stdlib_cache, name) {
            return Some(found);
        }

        // Qualified variants: any `Outer::name`
        let suffix = format!("::{name}");
        self.all_symbols()
            .find(|s| s.name.ends_with(&suffix))
            .cloned()
    }

    /// Lookup for `@ivar` words: accessors and instance variables.
    pub fn find_property_definition(&mut self, word: &str) -> Option<SymbolInfo> {
        self.scan_if_needed();
        let bare = word.trim_start_matches('@');
        let at_name = format!("@{bare}");
        self.all_symbols()
            .find(|s| {
                matches!(
                    s.kind,
                    SymbolKind::Property
                        | SymbolKind::Getter
                        | SymbolKind::Setter
                        | SymbolKind::InstanceVariable
                ) && (s.short_name() == at_name || s.short_name() == word)
            })
            .cloned()
    }

    /// Find `receiver_type#method` by qualified name.
    pub fn find_method_definition(
        &mut self,
        receiver_type: &str,
        method: &str,
    ) -> Option<SymbolInfo> {
        self.scan_if_needed();
        let qualified = format!("{receiver_type}::{method}");
        if let Some(found) = self
            .all_symbols()
            .find(|s| matches!(s.kind, SymbolKind::Method | SymbolKind::Fun) && s.name == qualified)
        {
            return Some(found.clone());
        }

        // Receiver may itself be nested: match `...::Receiver::method`
        let suffix = format!("::{receiver_type}::{method}");
        self.all_symbols()
            .find(|s| {
                matches!(s.kind, SymbolKind::Method | SymbolKind::Fun) && s.name.ends_with(&suffix)
            })
            .cloned()
    }

    /// Methods the index knows for a receiver type.
    pub fn methods_of_type(&self, type_name: &str) -> Vec<SymbolInfo> {
        let prefix = format!("{type_name}::");
        let mut methods: Vec<SymbolInfo> = self
            .all_symbols()
            .filter(|s| {
                matches!(s.kind, SymbolKind::Method | SymbolKind::Fun)
                    && (s.name.starts_with(&prefix) || s.name.contains(&format!("::{prefix}")))
                    && !s.short_name().is_empty()
            })
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.short_name().cmp(b.short_name()));
        methods.dedup_by(|a, b| a.short_name() == b.short_name());
        methods
    }

    /// Properties, instance variables, and methods declared under a class.
    pub fn class_members(&self, type_name: &str) -> Vec<SymbolInfo> {
        let prefix = format!("{type_name}::");
        let mut members: Vec<SymbolInfo> = self
            .all_symbols()
            .filter(|s| {
                matches!(
                    s.kind,
                    SymbolKind::Property
                        | SymbolKind::Getter
                        | SymbolKind::Setter
                        | SymbolKind::InstanceVariable
                        | SymbolKind::Method
                        | SymbolKind::Constant
                ) && s.name.starts_with(&prefix)
            })
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members.dedup_by(|a, b| a.name == b.name);
        members
    }

    /// Struct members use the same qualified-name scheme as classes.
    pub fn struct_members(&self, type_name: &str) -> Vec<SymbolInfo> {
        self.class_members(type_name)
    }

    /// Values of an enum, read from the file that declares it.
    pub fn enum_values(&self, enum_symbol: &SymbolInfo) -> Vec<String> {
        let content = match std::fs::read_to_string(&enum_symbol.file) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        let lines: Vec<&str> = content.split('\n').collect();
        let parent_line = enum_symbol.line as usize;
        let parent_indent = lines
            .get(parent_line)
            .map(|l| indent_of(l))
            .unwrap_or(0);

        let member_re = Regex::new(r"^([A-Z]\w*)\s*(?:=.*)?$").expect("member pattern");
        let mut values = Vec::new();
        for line in lines.iter().skip(parent_line + 1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if indent_of(line) <= parent_indent && is_member_terminator(trimmed) {
                break;
            }
            if let Some(caps) = member_re.captures(trimmed) {
                values.push(caps[1].to_string());
            }
        }
        values
    }

    /// Locate a member (enum value, nested type, or constant) inside the
    /// body of a previously found parent symbol.
    pub fn find_member(&self, parent: &SymbolInfo, member: &str) -> Option<SymbolInfo> {
        let content = std::fs::read_to_string(&parent.file).ok()?;
        let lines: Vec<&str> = content.split('\n').collect();
        let parent_line = parent.line as usize;
        let parent_indent = lines.get(parent_line).map(|l| indent_of(l)).unwrap_or(0);

        let escaped = regex::escape(member);
        let enum_member_re = Regex::new(&format!(r"^{escaped}\s*(=|$)")).ok()?;
        let nested_re =
            Regex::new(&format!(r"^(class|module|struct|enum)\s+{escaped}\b")).ok()?;
        let const_re = Regex::new(&format!(r"^{escaped}\s*=")).ok()?;

        for (offset, line) in lines.iter().enumerate().skip(parent_line + 1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if indent_of(line) <= parent_indent && is_member_terminator(trimmed) {
                break;
            }

            let kind = if nested_re.is_match(trimmed) {
                let keyword = trimmed.split_whitespace().next().unwrap_or("class");
                Some(match keyword {
                    "module" => SymbolKind::Module,
                    "struct" => SymbolKind::Struct,
                    "enum" => SymbolKind::Enum,
                    _ => SymbolKind::Class,
                })
            } else if parent.kind == SymbolKind::Enum && enum_member_re.is_match(trimmed) {
                Some(SymbolKind::EnumMember)
            } else if const_re.is_match(trimmed) {
                Some(SymbolKind::Constant)
            } else {
                None
            };

            if let Some(kind) = kind {
                let type_name = match kind {
                    SymbolKind::EnumMember => parent.name.clone(),
                    SymbolKind::Constant => {
                        infer_type(trimmed.split('=').nth(1).unwrap_or("").trim())
                    }
                    _ => kind.keyword().to_string(),
                };
                return Some(
                    SymbolInfo::new(
                        format!("{}::{member}", parent.name),
                        kind,
                        type_name,
                        parent.file.clone(),
                        offset as u32,
                    )
                    .with_signature(trimmed),
                );
            }
        }
        None
    }

    /// Case-insensitive substring query for `workspace/symbol`.
    pub fn query_symbols(&mut self, query: &str) -> Vec<SymbolInfo> {
        self.scan_if_needed();
        let needle = query.to_lowercase();
        self.all_symbols()
            .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
            .take(SYMBOL_QUERY_LIMIT)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn stdlib_len(&self) -> usize {
        self.stdlib_cache.len()
    }
}

/// Resolve a local variable's type by walking back through the lines above
/// the use site: assignments first, then `@ivar :` declarations, then
/// typed `def` parameters.
pub fn type_of_variable(lines: &[String], line: u32, name: &str) -> Option<String> {
    let escaped = regex::escape(name);
    let assign_re = Regex::new(&format!(r"^\s*{escaped}\s*=\s*(.+)$")).ok()?;
    let ivar_re = Regex::new(&format!(r"{escaped}\s*:\s*([\w:()?*, ]+)")).ok()?;
    let param_re = Regex::new(&format!(
        r"\bdef\b[^#]*[(,\s]{escaped}\s*:\s*([\w:]+(?:\([\w:, ]*\))?[?*]?)"
    ))
    .ok()?;

    let upper = (line as usize + 1).min(lines.len());
    for text in lines[..upper].iter().rev() {
        if name.starts_with('@') {
            if let Some(caps) = ivar_re.captures(text) {
                return Some(caps[1].trim().to_string());
            }
        }
        if let Some(caps) = assign_re.captures(text) {
            return Some(infer_type(&caps[1]));
        }
        if let Some(caps) = param_re.captures(text) {
            return Some(caps[1].trim().to_string());
        }
    }
    None
}

fn is_crystal_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("cr")
}

fn is_member_terminator(trimmed: &str) -> bool {
    trimmed == "end"
        || trimmed.starts_with("end ")
        || trimmed.starts_with("class ")
        || trimmed.starts_with("module ")
        || trimmed.starts_with("struct ")
        || trimmed.starts_with("enum ")
}

fn scan_tree_into(root: &Path, depth: usize, deny: &[&str], cache: &mut SymbolCache) {
    let walker = WalkDir::new(root)
        .max_depth(depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.depth() == 0 {
                return true;
            }
            if name.starts_with('.') {
                return false;
            }
            if entry.file_type().is_dir() && deny.iter().any(|d| *d == name) {
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!("scan under {}: {error}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_crystal_file(entry.path()) {
            continue;
        }
        match std::fs::read_to_string(entry.path()) {
            Ok(content) => {
                cache.insert(
                    entry.path().to_path_buf(),
                    extract_symbols(entry.path(), &content),
                );
            }
            Err(error) => {
                warn!("skipping {}: {error}", entry.path().display());
            }
        }
    }
}

fn exact_match(cache: &SymbolCache, name: &str) -> Option<SymbolInfo> {
    cache
        .values()
        .flatten()
        .find(|s| s.name == name)
        .cloned()
}
