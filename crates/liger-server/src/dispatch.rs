//! Request/notification dispatch and server lifecycle.
//!
//! Messages with an `id` are requests and always get exactly one
//! response; messages without one are notifications and never do.
//! Handler failures are converted to JSON-RPC error responses, panics
//! included, so no error escapes the loop. The lifecycle runs
//! `Created → Initialized → ShuttingDown`; `exit` ends the process with
//! code 0 after a `shutdown`, 1 otherwise.

use std::panic::{catch_unwind, AssertUnwindSafe};

use liger_core::{ErrorCode, LigerError, LigerResult, Position, Severity, SymbolKind};
use log::{debug, error, info, warn};
use lsp_types::{
    CompletionOptions, CompletionParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, DocumentSymbolParams,
    GotoDefinitionParams, HoverProviderCapability, InitializeParams, OneOf,
    PublishDiagnosticsParams, ReferenceParams, RenameOptions, RenameParams, ServerCapabilities,
    ServerInfo, SignatureHelpOptions, TextDocumentPositionParams, TextDocumentSyncCapability,
    TextDocumentSyncKind, Url, WorkDoneProgressOptions, WorkspaceSymbolParams,
};
use serde_json::{json, Value};

use crate::completions::CompletionKind;
use crate::documents::ContentChange;
use crate::paths;
use crate::Server;

/// Lifecycle state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    ShuttingDown,
}

/// What the read loop should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Exit(i32),
}

/// Routes parsed messages to the server and produces outbound messages.
pub struct Dispatcher {
    server: Server,
    state: LifecycleState,
    shutdown_requested: bool,
    cancelled: rustc_hash::FxHashSet<String>,
}

impl Dispatcher {
    pub fn new(server: Server) -> Self {
        Self {
            server,
            state: LifecycleState::Created,
            shutdown_requested: false,
            cancelled: rustc_hash::FxHashSet::default(),
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle one decoded message. Returns outbound messages (responses
    /// and notifications, in send order) and the loop action.
    pub fn handle(&mut self, message: Value) -> (Vec<Value>, LoopAction) {
        let object = match message.as_object() {
            Some(object) => object,
            None => {
                return (
                    vec![error_response(
                        Value::Null,
                        ErrorCode::InvalidRequest,
                        "message is not an object",
                        None,
                    )],
                    LoopAction::Continue,
                );
            }
        };

        let id = object.get("id").cloned();
        let method = object
            .get("method")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string());
        let params = object.get("params").cloned().unwrap_or(Value::Null);

        match (id, method) {
            (Some(id), Some(method)) => (self.handle_request(id, &method, params), LoopAction::Continue),
            (None, Some(method)) => self.handle_notification(&method, params),
            (Some(_), None) => {
                // A response to a server-initiated request; we never send any
                debug!("ignoring response message from client");
                (Vec::new(), LoopAction::Continue)
            }
            (None, None) => {
                warn!("message with neither id nor method");
                (Vec::new(), LoopAction::Continue)
            }
        }
    }

    // === requests ===

    fn handle_request(&mut self, id: Value, method: &str, params: Value) -> Vec<Value> {
        if self.cancelled.remove(&id.to_string()) {
            return vec![error_response(
                id,
                ErrorCode::RequestCancelled,
                "request cancelled",
                None,
            )];
        }

        // Lifecycle gates
        match (self.state, method) {
            (LifecycleState::Created, "initialize") => {
                return vec![match self.handle_initialize(&params) {
                    Ok(result) => {
                        self.state = LifecycleState::Initialized;
                        response(id, result)
                    }
                    Err(err) => error_from(id, &err),
                }];
            }
            (_, "initialize") => {
                return vec![error_response(
                    id,
                    ErrorCode::InvalidRequest,
                    "initialize may only be sent once",
                    None,
                )];
            }
            (LifecycleState::Created, _) => {
                return vec![error_response(
                    id,
                    ErrorCode::ServerNotInitialized,
                    "server not initialized",
                    None,
                )];
            }
            (LifecycleState::ShuttingDown, _) => {
                return vec![error_response(
                    id,
                    ErrorCode::InvalidRequest,
                    "server is shutting down",
                    None,
                )];
            }
            (LifecycleState::Initialized, "shutdown") => {
                self.shutdown_requested = true;
                self.state = LifecycleState::ShuttingDown;
                return vec![response(id, Value::Null)];
            }
            (LifecycleState::Initialized, _) => {}
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.route_request(method, params)));
        let message = match outcome {
            Ok(Ok(result)) => response(id, result),
            Ok(Err(err)) => error_from(id, &err),
            Err(payload) => {
                let text = panic_text(payload);
                error!("handler for {method} panicked: {text}");
                error_response(
                    id,
                    ErrorCode::InternalError,
                    format!("internal error in {method}"),
                    Some(json!(text)),
                )
            }
        };
        vec![message]
    }

    fn route_request(&mut self, method: &str, params: Value) -> LigerResult<Value> {
        match method {
            "textDocument/hover" => {
                let params: lsp_types::HoverParams = decode(method, params)?;
                let uri = params
                    .text_document_position_params
                    .text_document
                    .uri
                    .to_string();
                let position = from_lsp_position(params.text_document_position_params.position);
                match self.server.hover(&uri, position) {
                    Some(info) => {
                        let hover = lsp_types::Hover {
                            contents: lsp_types::HoverContents::Markup(lsp_types::MarkupContent {
                                kind: lsp_types::MarkupKind::Markdown,
                                value: info.contents,
                            }),
                            range: info.range.map(to_lsp_range),
                        };
                        Ok(serde_json::to_value(hover)?)
                    }
                    None => Ok(Value::Null),
                }
            }
            "textDocument/completion" => {
                let params: CompletionParams = decode(method, params)?;
                let uri = params.text_document_position.text_document.uri.to_string();
                let position = from_lsp_position(params.text_document_position.position);
                let items: Vec<lsp_types::CompletionItem> = self
                    .server
                    .completion(&uri, position)
                    .into_iter()
                    .map(to_lsp_completion)
                    .collect();
                Ok(serde_json::to_value(lsp_types::CompletionResponse::Array(
                    items,
                ))?)
            }
            "textDocument/definition" => {
                let params: GotoDefinitionParams = decode(method, params)?;
                let uri = params
                    .text_document_position_params
                    .text_document
                    .uri
                    .to_string();
                let position = from_lsp_position(params.text_document_position_params.position);
                match self
                    .server
                    .definition(&uri, position)
                    .and_then(|l| to_lsp_location(&l))
                {
                    Some(location) => Ok(serde_json::to_value(
                        lsp_types::GotoDefinitionResponse::Scalar(location),
                    )?),
                    None => Ok(Value::Null),
                }
            }
            "textDocument/references" => {
                let params: ReferenceParams = decode(method, params)?;
                let uri = params.text_document_position.text_document.uri.to_string();
                let position = from_lsp_position(params.text_document_position.position);
                let locations: Vec<lsp_types::Location> = self
                    .server
                    .references(&uri, position)
                    .iter()
                    .filter_map(to_lsp_location)
                    .collect();
                Ok(serde_json::to_value(locations)?)
            }
            "textDocument/documentSymbol" => {
                let params: DocumentSymbolParams = decode(method, params)?;
                let uri = params.text_document.uri.to_string();
                let symbols: Vec<lsp_types::DocumentSymbol> = self
                    .server
                    .document_symbols(&uri)
                    .into_iter()
                    .map(to_lsp_document_symbol)
                    .collect();
                Ok(serde_json::to_value(
                    lsp_types::DocumentSymbolResponse::Nested(symbols),
                )?)
            }
            "textDocument/rename" => {
                let params: RenameParams = decode(method, params)?;
                let uri = params.text_document_position.text_document.uri.to_string();
                let position = from_lsp_position(params.text_document_position.position);
                match self.server.rename(&uri, position, &params.new_name) {
                    Some(edit) => Ok(serde_json::to_value(to_lsp_workspace_edit(edit))?),
                    None => Ok(Value::Null),
                }
            }
            "textDocument/prepareRename" => {
                let params: TextDocumentPositionParams = decode(method, params)?;
                let uri = params.text_document.uri.to_string();
                let position = from_lsp_position(params.position);
                match self.server.prepare_rename(&uri, position) {
                    Some(range) => Ok(serde_json::to_value(to_lsp_range(range))?),
                    None => Ok(Value::Null),
                }
            }
            "textDocument/signatureHelp" => Ok(Value::Null),
            "workspace/symbol" => {
                let params: WorkspaceSymbolParams = decode(method, params)?;
                let symbols = self.server.workspace_symbols(&params.query);
                let informations: Vec<Value> = symbols
                    .iter()
                    .filter_map(|symbol| {
                        let uri = Url::parse(&paths::path_to_uri(&symbol.file)).ok()?;
                        #[allow(deprecated)]
                        let info = lsp_types::SymbolInformation {
                            name: symbol.name.clone(),
                            kind: to_lsp_symbol_kind(symbol.kind),
                            tags: None,
                            deprecated: None,
                            location: lsp_types::Location {
                                uri,
                                range: to_lsp_range(liger_core::Range::on_line(
                                    symbol.line,
                                    0,
                                    symbol.short_name().chars().count() as u32,
                                )),
                            },
                            container_name: None,
                        };
                        serde_json::to_value(info).ok()
                    })
                    .collect();
                Ok(Value::Array(informations))
            }
            _ => Err(LigerError::MethodNotFound {
                method: method.to_string(),
            }),
        }
    }

    fn handle_initialize(&mut self, params: &Value) -> LigerResult<Value> {
        let params: InitializeParams = serde_json::from_value(params.clone()).map_err(|e| {
            LigerError::InvalidParams {
                method: "initialize".into(),
                message: e.to_string(),
            }
        })?;

        #[allow(deprecated)]
        if let Some(root_uri) = params.root_uri {
            if let Some(root) = paths::uri_to_path(root_uri.as_str()) {
                info!("workspace root: {}", root.display());
                self.server.set_root(&root);
                if let Err(err) = std::fs::create_dir_all(root.join(".liger-cache")) {
                    warn!("cannot create .liger-cache: {err}");
                }
            }
        }

        let result = lsp_types::InitializeResult {
            capabilities: capabilities(),
            server_info: Some(ServerInfo {
                name: "liger".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        };
        Ok(serde_json::to_value(result)?)
    }

    // === notifications ===

    fn handle_notification(&mut self, method: &str, params: Value) -> (Vec<Value>, LoopAction) {
        match method {
            "initialized" => {
                info!("client initialized");
                (Vec::new(), LoopAction::Continue)
            }
            "exit" => {
                let code = if self.shutdown_requested { 0 } else { 1 };
                info!("exit requested, terminating with {code}");
                (Vec::new(), LoopAction::Exit(code))
            }
            "$/cancelRequest" => {
                if let Some(id) = params.get("id") {
                    self.cancelled.insert(id.to_string());
                }
                (Vec::new(), LoopAction::Continue)
            }
            _ => {
                let outgoing = match self.text_sync_notification(method, params) {
                    Ok(outgoing) => outgoing,
                    Err(err) => {
                        // Notifications never produce responses, even on error
                        error!("notification {method} failed: {err}");
                        Vec::new()
                    }
                };
                (outgoing, LoopAction::Continue)
            }
        }
    }

    fn text_sync_notification(&mut self, method: &str, params: Value) -> LigerResult<Vec<Value>> {
        match method {
            "textDocument/didOpen" => {
                let params: DidOpenTextDocumentParams = decode(method, params)?;
                let doc = params.text_document;
                let uri = doc.uri.to_string();
                self.server
                    .open_document(&uri, &doc.language_id, doc.version, &doc.text);
                Ok(self.publish_diagnostics(&uri).into_iter().collect())
            }
            "textDocument/didChange" => {
                let params: DidChangeTextDocumentParams = decode(method, params)?;
                let uri = params.text_document.uri.to_string();
                let changes: Vec<ContentChange> = params
                    .content_changes
                    .into_iter()
                    .map(|change| ContentChange {
                        range: change.range.map(from_lsp_range),
                        text: change.text,
                    })
                    .collect();
                self.server
                    .change_document(&uri, params.text_document.version, &changes);
                Ok(self.publish_diagnostics(&uri).into_iter().collect())
            }
            "textDocument/didSave" => {
                let params: DidSaveTextDocumentParams = decode(method, params)?;
                let uri = params.text_document.uri.to_string();
                self.server.save_document(&uri);
                Ok(self.publish_diagnostics(&uri).into_iter().collect())
            }
            "textDocument/didClose" => {
                let params: DidCloseTextDocumentParams = decode(method, params)?;
                let uri = params.text_document.uri.to_string();
                self.server.close_document(&uri);
                Ok(Vec::new())
            }
            _ => {
                debug!("unhandled notification: {method}");
                Ok(Vec::new())
            }
        }
    }

    /// Build the publishDiagnostics notification for a document. This
    /// never fails back into the caller; conversion problems are logged
    /// and swallowed.
    fn publish_diagnostics(&self, uri: &str) -> Option<Value> {
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(err) => {
                warn!("cannot publish diagnostics for {uri}: {err}");
                return None;
            }
        };

        let diagnostics: Vec<lsp_types::Diagnostic> = self
            .server
            .diagnostics_for(uri)
            .iter()
            .map(|diag| lsp_types::Diagnostic {
                range: to_lsp_range(diag.range),
                severity: Some(match diag.severity {
                    Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
                    Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
                    Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
                    Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
                }),
                source: diag.source.clone(),
                message: diag.message.clone(),
                ..Default::default()
            })
            .collect();

        let params = PublishDiagnosticsParams {
            uri: url,
            diagnostics,
            version: None,
        };
        match serde_json::to_value(params) {
            Ok(value) => Some(json!({
                "jsonrpc": "2.0",
                "method": "textDocument/publishDiagnostics",
                "params": value,
            })),
            Err(err) => {
                warn!("diagnostics serialization failed: {err}");
                None
            }
        }
    }
}

// === capability advertisement ===

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec![".".into(), ":".into(), "@".into()]),
            resolve_provider: Some(false),
            all_commit_characters: None,
            work_done_progress_options: WorkDoneProgressOptions::default(),
            completion_item: None,
        }),
        signature_help_provider: Some(SignatureHelpOptions {
            trigger_characters: Some(vec!["(".into(), ",".into()]),
            retrigger_characters: None,
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        workspace_symbol_provider: Some(OneOf::Left(true)),
        rename_provider: Some(OneOf::Right(RenameOptions {
            prepare_provider: Some(true),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        })),
        ..Default::default()
    }
}

// === message builders ===

fn response(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn error_response(
    id: Value,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<Value>,
) -> Value {
    let mut error = json!({"code": code.code(), "message": message.into()});
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({"jsonrpc": "2.0", "id": id, "error": error})
}

fn error_from(id: Value, err: &LigerError) -> Value {
    let data = match err.error_code() {
        ErrorCode::InternalError => Some(json!(format!(
            "{err}\n{}",
            std::backtrace::Backtrace::force_capture()
        ))),
        _ => None,
    };
    error_response(id, err.error_code(), err.to_string(), data)
}

/// Build the error response for a frame whose body was not valid JSON.
pub fn parse_error_response(err: &LigerError) -> Value {
    error_response(Value::Null, ErrorCode::ParseError, err.to_string(), None)
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, params: Value) -> LigerResult<T> {
    serde_json::from_value(params).map_err(|e| LigerError::InvalidParams {
        method: method.to_string(),
        message: e.to_string(),
    })
}

// === type conversions ===

fn from_lsp_position(position: lsp_types::Position) -> Position {
    Position::new(position.line, position.character)
}

fn from_lsp_range(range: lsp_types::Range) -> liger_core::Range {
    liger_core::Range::new(
        from_lsp_position(range.start),
        from_lsp_position(range.end),
    )
}

fn to_lsp_position(position: Position) -> lsp_types::Position {
    lsp_types::Position {
        line: position.line,
        character: position.character,
    }
}

fn to_lsp_range(range: liger_core::Range) -> lsp_types::Range {
    lsp_types::Range {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

fn to_lsp_location(location: &liger_core::Location) -> Option<lsp_types::Location> {
    let uri = Url::parse(&location.uri).ok()?;
    Some(lsp_types::Location {
        uri,
        range: to_lsp_range(location.range),
    })
}

fn to_lsp_symbol_kind(kind: SymbolKind) -> lsp_types::SymbolKind {
    match kind {
        SymbolKind::Class => lsp_types::SymbolKind::CLASS,
        SymbolKind::Module => lsp_types::SymbolKind::MODULE,
        SymbolKind::Struct => lsp_types::SymbolKind::STRUCT,
        SymbolKind::Enum => lsp_types::SymbolKind::ENUM,
        SymbolKind::EnumMember => lsp_types::SymbolKind::ENUM_MEMBER,
        SymbolKind::Lib => lsp_types::SymbolKind::NAMESPACE,
        SymbolKind::Fun => lsp_types::SymbolKind::FUNCTION,
        SymbolKind::Method => lsp_types::SymbolKind::METHOD,
        SymbolKind::Property | SymbolKind::Getter | SymbolKind::Setter => {
            lsp_types::SymbolKind::PROPERTY
        }
        SymbolKind::InstanceVariable => lsp_types::SymbolKind::FIELD,
        SymbolKind::Variable => lsp_types::SymbolKind::VARIABLE,
        SymbolKind::Constant => lsp_types::SymbolKind::CONSTANT,
        SymbolKind::Alias => lsp_types::SymbolKind::CLASS,
    }
}

fn to_lsp_completion(item: crate::completions::CompletionItem) -> lsp_types::CompletionItem {
    lsp_types::CompletionItem {
        label: item.label,
        kind: Some(match item.kind {
            CompletionKind::Keyword => lsp_types::CompletionItemKind::KEYWORD,
            CompletionKind::Type => lsp_types::CompletionItemKind::CLASS,
            CompletionKind::Method => lsp_types::CompletionItemKind::METHOD,
            CompletionKind::Property => lsp_types::CompletionItemKind::PROPERTY,
            CompletionKind::Variable => lsp_types::CompletionItemKind::VARIABLE,
            CompletionKind::Constant => lsp_types::CompletionItemKind::CONSTANT,
            CompletionKind::Module => lsp_types::CompletionItemKind::MODULE,
        }),
        detail: item.detail,
        documentation: item.documentation.map(|doc| {
            lsp_types::Documentation::MarkupContent(lsp_types::MarkupContent {
                kind: lsp_types::MarkupKind::Markdown,
                value: doc,
            })
        }),
        ..Default::default()
    }
}

fn to_lsp_document_symbol(
    symbol: crate::document_symbols::DocumentSymbol,
) -> lsp_types::DocumentSymbol {
    #[allow(deprecated)]
    lsp_types::DocumentSymbol {
        name: symbol.name,
        detail: symbol.detail,
        kind: to_lsp_symbol_kind(symbol.kind),
        tags: None,
        deprecated: None,
        range: to_lsp_range(symbol.range),
        selection_range: to_lsp_range(symbol.selection_range),
        children: if symbol.children.is_empty() {
            None
        } else {
            Some(
                symbol
                    .children
                    .into_iter()
                    .map(to_lsp_document_symbol)
                    .collect(),
            )
        },
    }
}

fn to_lsp_workspace_edit(edit: crate::rename::WorkspaceEdit) -> lsp_types::WorkspaceEdit {
    let changes = edit
        .changes
        .into_iter()
        .filter_map(|(uri, edits)| {
            let url = Url::parse(&uri).ok()?;
            let edits = edits
                .into_iter()
                .map(|edit| lsp_types::TextEdit {
                    range: to_lsp_range(edit.range),
                    new_text: edit.new_text,
                })
                .collect();
            Some((url, edits))
        })
        .collect();
    lsp_types::WorkspaceEdit {
        changes: Some(changes),
        document_changes: None,
        change_annotations: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::NullOracle;
    use crate::ServerConfig;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Server::with_oracle(
            std::env::temp_dir().join("liger-dispatch-tests-nonexistent"),
            ServerConfig::default(),
            Box::new(NullOracle),
        ))
    }

    fn initialized_dispatcher() -> Dispatcher {
        let mut d = dispatcher();
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {"capabilities": {}}
        }));
        assert!(out[0]["result"]["capabilities"].is_object());
        d
    }

    fn open(d: &mut Dispatcher, uri: &str, text: &str) -> Vec<Value> {
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "method": "textDocument/didOpen",
            "params": {"textDocument": {
                "uri": uri, "languageId": "crystal", "version": 1, "text": text
            }}
        }));
        out
    }

    #[test]
    fn test_request_before_initialize_is_rejected() {
        let mut d = dispatcher();
        let (out, action) = d.handle(json!({
            "jsonrpc": "2.0", "id": 1, "method": "textDocument/hover", "params": {}
        }));
        assert_eq!(action, LoopAction::Continue);
        assert_eq!(out[0]["error"]["code"], -32002);
    }

    #[test]
    fn test_initialize_advertises_capabilities() {
        let mut d = dispatcher();
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"capabilities": {}}
        }));
        let caps = &out[0]["result"]["capabilities"];
        assert_eq!(caps["textDocumentSync"], 1);
        assert_eq!(caps["hoverProvider"], true);
        assert_eq!(caps["completionProvider"]["triggerCharacters"], json!([".", ":", "@"]));
        assert_eq!(caps["renameProvider"]["prepareProvider"], true);
        assert_eq!(caps["definitionProvider"], true);
        assert_eq!(out[0]["result"]["serverInfo"]["name"], "liger");
    }

    #[test]
    fn test_second_initialize_is_invalid_request() {
        let mut d = initialized_dispatcher();
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 9, "method": "initialize", "params": {"capabilities": {}}
        }));
        assert_eq!(out[0]["error"]["code"], -32600);
    }

    #[test]
    fn test_unknown_method_is_method_not_found() {
        let mut d = initialized_dispatcher();
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 2, "method": "textDocument/typeDefinition", "params": {}
        }));
        assert_eq!(out[0]["error"]["code"], -32601);
        assert_eq!(out[0]["id"], 2);
    }

    #[test]
    fn test_bad_params_is_invalid_params() {
        let mut d = initialized_dispatcher();
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 3, "method": "textDocument/hover", "params": {"nope": 1}
        }));
        assert_eq!(out[0]["error"]["code"], -32602);
    }

    #[test]
    fn test_shutdown_then_exit_code_zero() {
        let mut d = initialized_dispatcher();
        let (out, _) = d.handle(json!({"jsonrpc": "2.0", "id": 5, "method": "shutdown"}));
        assert_eq!(out[0]["result"], Value::Null);
        assert_eq!(d.state(), LifecycleState::ShuttingDown);

        let (_, action) = d.handle(json!({"jsonrpc": "2.0", "method": "exit"}));
        assert_eq!(action, LoopAction::Exit(0));
    }

    #[test]
    fn test_exit_without_shutdown_code_one() {
        let mut d = initialized_dispatcher();
        let (_, action) = d.handle(json!({"jsonrpc": "2.0", "method": "exit"}));
        assert_eq!(action, LoopAction::Exit(1));
    }

    #[test]
    fn test_requests_after_shutdown_rejected() {
        let mut d = initialized_dispatcher();
        d.handle(json!({"jsonrpc": "2.0", "id": 5, "method": "shutdown"}));
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 6, "method": "textDocument/hover", "params": {}
        }));
        assert_eq!(out[0]["error"]["code"], -32600);
    }

    #[test]
    fn test_did_open_publishes_diagnostics() {
        let mut d = initialized_dispatcher();
        let out = open(&mut d, "file:///t.cr", "class A\nend\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["method"], "textDocument/publishDiagnostics");
        assert_eq!(out[0]["params"]["uri"], "file:///t.cr");
        assert_eq!(out[0]["params"]["diagnostics"], json!([]));
    }

    #[test]
    fn test_did_change_publishes_fresh_diagnostics() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "class A\nend\n");

        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "method": "textDocument/didChange",
            "params": {
                "textDocument": {"uri": "file:///t.cr", "version": 2},
                "contentChanges": [{"text": "class A\n"}]
            }
        }));
        let diags = out[0]["params"]["diagnostics"].as_array().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0]["severity"], 1);
        assert_eq!(diags[0]["source"], "crystal");
    }

    #[test]
    fn test_incremental_change_scenario() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "line 1\nline 2\nline 3");

        d.handle(json!({
            "jsonrpc": "2.0", "method": "textDocument/didChange",
            "params": {
                "textDocument": {"uri": "file:///t.cr", "version": 2},
                "contentChanges": [{
                    "range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 6}},
                    "text": "modified"
                }]
            }
        }));

        let doc = d.server().documents().get("file:///t.cr").unwrap();
        assert_eq!(doc.text(), "line 1\nmodified\nline 3");
        assert_eq!(doc.version, 2);
        assert_eq!(doc.line_count(), 3);
    }

    #[test]
    fn test_notification_for_unknown_document_produces_no_response() {
        let mut d = initialized_dispatcher();
        let (out, action) = d.handle(json!({
            "jsonrpc": "2.0", "method": "textDocument/didChange",
            "params": {
                "textDocument": {"uri": "file:///ghost.cr", "version": 1},
                "contentChanges": [{"text": "x"}]
            }
        }));
        assert_eq!(action, LoopAction::Continue);
        // Diagnostics for the unknown doc are published as empty
        assert_eq!(out[0]["params"]["diagnostics"], json!([]));
    }

    #[test]
    fn test_cancelled_request_answered_with_cancellation() {
        let mut d = initialized_dispatcher();
        d.handle(json!({
            "jsonrpc": "2.0", "method": "$/cancelRequest", "params": {"id": 42}
        }));
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 42, "method": "textDocument/hover", "params": {}
        }));
        assert_eq!(out[0]["error"]["code"], -32800);
    }

    #[test]
    fn test_hover_round_trip() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "# Greets.\ndef greet\nend\ngreet\n");

        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 7, "method": "textDocument/hover",
            "params": {
                "textDocument": {"uri": "file:///t.cr"},
                "position": {"line": 3, "character": 2}
            }
        }));
        let value = out[0]["result"]["contents"]["value"].as_str().unwrap();
        assert!(value.contains("def greet"));
        assert!(value.contains("Greets."));
    }

    #[test]
    fn test_document_symbol_round_trip() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "module M\n  class C\n    def m\n    end\n  end\nend\n");

        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 8, "method": "textDocument/documentSymbol",
            "params": {"textDocument": {"uri": "file:///t.cr"}}
        }));
        let result = &out[0]["result"];
        assert_eq!(result[0]["name"], "M");
        assert_eq!(result[0]["children"][0]["name"], "C");
        assert_eq!(result[0]["children"][0]["children"][0]["name"], "m");
    }

    #[test]
    fn test_rename_round_trip() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "foo = 1\nbar = foo + foo");

        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 9, "method": "textDocument/rename",
            "params": {
                "textDocument": {"uri": "file:///t.cr"},
                "position": {"line": 1, "character": 6},
                "newName": "qux"
            }
        }));
        let edits = &out[0]["result"]["changes"]["file:///t.cr"];
        assert_eq!(edits.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_signature_help_is_null() {
        let mut d = initialized_dispatcher();
        open(&mut d, "file:///t.cr", "def f(a)\nend\n");
        let (out, _) = d.handle(json!({
            "jsonrpc": "2.0", "id": 10, "method": "textDocument/signatureHelp",
            "params": {
                "textDocument": {"uri": "file:///t.cr"},
                "position": {"line": 0, "character": 6}
            }
        }));
        assert_eq!(out[0]["result"], Value::Null);
    }

    #[test]
    fn test_non_object_message_is_invalid_request() {
        let mut d = initialized_dispatcher();
        let (out, _) = d.handle(json!([1, 2, 3]));
        assert_eq!(out[0]["error"]["code"], -32600);
        assert_eq!(out[0]["id"], Value::Null);
    }
}
