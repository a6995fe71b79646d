//! Language server for Crystal.
//!
//! This crate wires the document store, the Crystal syntax frontend, the
//! workspace index, and the compiler oracle behind an LSP stdio loop.

pub mod builtins;
pub mod completions;
pub mod diagnostics;
pub mod dispatch;
pub mod document_symbols;
pub mod documents;
pub mod goto_definition;
pub mod hover;
pub mod oracle;
pub mod paths;
pub mod rename;
pub mod requires;
pub mod transport;
pub mod utils;
pub mod workspace;

use std::path::{Path, PathBuf};

use liger_core::{Diagnostics, Location, Position, Range, SymbolInfo};
use liger_syntax::Program;
use log::debug;
use rustc_hash::FxHashMap;

use completions::CompletionItem;
use diagnostics::DiagnosticsConfig;
use document_symbols::DocumentSymbol;
use documents::{ContentChange, DocumentStore};
use hover::HoverInfo;
use oracle::{CompilerOracle, CrystalOracle, MainFileCache, SourceFlusher};
use rename::WorkspaceEdit;
use workspace::WorkspaceIndex;

/// Server configuration assembled from CLI flags.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Extra advisory diagnostics (`--strict`)
    pub strict: bool,
    /// Whether diagnostics are published at all
    pub enable_diagnostics: bool,
    /// Whether the compiler oracle may be consulted
    pub oracle_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            enable_diagnostics: true,
            oracle_enabled: true,
        }
    }
}

/// The Crystal language server.
pub struct Server {
    config: ServerConfig,
    root: PathBuf,
    documents: DocumentStore,
    asts: FxHashMap<String, Option<Program>>,
    diagnostics: FxHashMap<String, Diagnostics>,
    index: WorkspaceIndex,
    oracle: Box<dyn CompilerOracle>,
    main_file: MainFileCache,
    flusher: SourceFlusher,
}

impl Server {
    /// Create a server rooted at the given workspace directory with the
    /// production oracle.
    pub fn new(root: impl Into<PathBuf>, config: ServerConfig) -> Self {
        Self::with_oracle(root, config, Box::new(CrystalOracle::new()))
    }

    /// Create a server with a caller-supplied oracle (tests use a double).
    pub fn with_oracle(
        root: impl Into<PathBuf>,
        config: ServerConfig,
        oracle: Box<dyn CompilerOracle>,
    ) -> Self {
        let root = root.into();
        Self {
            config,
            index: WorkspaceIndex::new(&root),
            main_file: MainFileCache::new(&root),
            root,
            documents: DocumentStore::new(),
            asts: FxHashMap::default(),
            diagnostics: FxHashMap::default(),
            oracle,
            flusher: SourceFlusher::new(),
        }
    }

    /// Re-root the server once the client's `initialize` names a
    /// workspace folder.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        self.index = WorkspaceIndex::new(&root);
        self.main_file = MainFileCache::new(&root);
        self.root = root;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    // === text synchronization ===

    pub fn open_document(&mut self, uri: &str, language_id: &str, version: i32, text: &str) {
        self.documents.open(uri, language_id, version, text);
        self.index.update_source(uri, text);
        self.reanalyze(uri);
    }

    /// Apply a change batch. Unknown URIs are a no-op.
    pub fn change_document(&mut self, uri: &str, version: i32, changes: &[ContentChange]) {
        if !self.documents.contains(uri) {
            debug!("didChange for unopened {uri}");
            return;
        }
        self.documents.change(uri, version, changes);
        if let Some(doc) = self.documents.get(uri) {
            let text = doc.text().to_string();
            self.index.update_source(uri, &text);
        }
        self.reanalyze(uri);
    }

    /// `didSave`: refresh analysis from the in-memory text.
    pub fn save_document(&mut self, uri: &str) {
        if !self.documents.contains(uri) {
            return;
        }
        if let Some(doc) = self.documents.get(uri) {
            let text = doc.text().to_string();
            self.index.update_source(uri, &text);
        }
        self.reanalyze(uri);
    }

    pub fn close_document(&mut self, uri: &str) {
        self.documents.close(uri);
        self.asts.remove(uri);
        self.diagnostics.remove(uri);
    }

    /// Reparse and recompute diagnostics for one document.
    fn reanalyze(&mut self, uri: &str) {
        let doc = match self.documents.get(uri) {
            Some(doc) => doc,
            None => return,
        };
        let ast = liger_syntax::parse(doc.text()).ok();
        let diags = if self.config.enable_diagnostics {
            diagnostics::compute_diagnostics(
                doc.text(),
                ast.as_ref(),
                &DiagnosticsConfig {
                    strict: self.config.strict,
                },
            )
        } else {
            Diagnostics::new()
        };
        self.asts.insert(uri.to_string(), ast);
        self.diagnostics.insert(uri.to_string(), diags);
    }

    /// The latest diagnostics for a document.
    pub fn diagnostics_for(&self, uri: &str) -> Diagnostics {
        self.diagnostics.get(uri).cloned().unwrap_or_default()
    }

    // === queries ===

    pub fn hover(&mut self, uri: &str, position: Position) -> Option<HoverInfo> {
        let Server {
            config,
            root,
            documents,
            index,
            oracle,
            main_file,
            flusher,
            ..
        } = self;
        let doc = documents.get(uri)?;
        let oracle: &dyn CompilerOracle = oracle.as_ref();

        let oracle_context = || {
            if !config.oracle_enabled {
                return None;
            }
            let path = flusher.sync(uri, doc.text())?;
            let main = main_file.get();
            oracle.context(
                &path,
                position.line + 1,
                position.character + 1,
                main.as_deref(),
            )
        };

        hover::hover(
            doc,
            position,
            root,
            index,
            || oracle.stdlib_roots(),
            oracle_context,
        )
    }

    pub fn definition(&mut self, uri: &str, position: Position) -> Option<Location> {
        let Server {
            config,
            root,
            documents,
            index,
            oracle,
            main_file,
            flusher,
            ..
        } = self;
        let doc = documents.get(uri)?;
        let oracle: &dyn CompilerOracle = oracle.as_ref();

        let oracle_fallback = || {
            if !config.oracle_enabled {
                return None;
            }
            let path = flusher.sync(uri, doc.text())?;
            let main = main_file.get();
            let hits = oracle.implementations(
                &path,
                position.line + 1,
                position.character + 1,
                main.as_deref(),
            );
            hits.first().map(|hit| {
                Location::new(
                    paths::path_to_uri(&hit.file),
                    Range::at(Position::new(
                        hit.line.saturating_sub(1),
                        hit.column.saturating_sub(1),
                    )),
                )
            })
        };

        goto_definition::find_definition(
            doc,
            position,
            root,
            index,
            || oracle.stdlib_roots(),
            oracle_fallback,
        )
    }

    pub fn completion(&mut self, uri: &str, position: Position) -> Vec<CompletionItem> {
        let doc = match self.documents.get(uri) {
            Some(doc) => doc,
            None => return Vec::new(),
        };
        let line = doc.line(position.line).unwrap_or("");
        let prefix: String = line.chars().take(position.character as usize).collect();
        let lines = doc.lines().to_vec();
        let ast = self.asts.get(uri).and_then(|a| a.as_ref()).cloned();

        completions::compute_completions(
            &prefix,
            &lines,
            position.line,
            ast.as_ref(),
            &mut self.index,
        )
    }

    pub fn document_symbols(&self, uri: &str) -> Vec<DocumentSymbol> {
        let doc = match self.documents.get(uri) {
            Some(doc) => doc,
            None => return Vec::new(),
        };
        match self.asts.get(uri).and_then(|a| a.as_ref()) {
            Some(program) => document_symbols::document_symbols(doc.text(), program),
            None => Vec::new(),
        }
    }

    pub fn rename(&self, uri: &str, position: Position, new_name: &str) -> Option<WorkspaceEdit> {
        let doc = self.documents.get(uri)?;
        rename::rename(doc, position, new_name)
    }

    pub fn prepare_rename(&self, uri: &str, position: Position) -> Option<Range> {
        let doc = self.documents.get(uri)?;
        rename::prepare_rename(doc, position)
    }

    pub fn references(&self, uri: &str, position: Position) -> Vec<Location> {
        match self.documents.get(uri) {
            Some(doc) => rename::find_references(doc, position),
            None => Vec::new(),
        }
    }

    pub fn workspace_symbols(&mut self, query: &str) -> Vec<SymbolInfo> {
        self.index.query_symbols(query)
    }

    /// Signature help is advertised but intentionally not computed.
    pub fn signature_help(&self, _uri: &str, _position: Position) -> Option<()> {
        None
    }
}
