//! End-to-end tests: complete Content-Length frames through the codec and
//! dispatcher, with a scripted compiler oracle.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use liger_server::dispatch::{Dispatcher, LoopAction};
use liger_server::oracle::{CompilerOracle, SourceLocation};
use liger_server::transport::{encode_frame, FrameReader, FrameWriter};
use liger_server::{Server, ServerConfig};
use serde_json::{json, Value};

/// Oracle double that replays a fixed implementations answer and records
/// whether it was consulted.
struct ScriptedOracle {
    implementations: Vec<SourceLocation>,
    context: Option<String>,
}

impl ScriptedOracle {
    fn silent() -> Self {
        Self {
            implementations: Vec::new(),
            context: None,
        }
    }
}

impl CompilerOracle for ScriptedOracle {
    fn implementations(
        &self,
        _file: &Path,
        _line: u32,
        _column: u32,
        _main: Option<&Path>,
    ) -> Vec<SourceLocation> {
        self.implementations.clone()
    }

    fn context(&self, _file: &Path, _line: u32, _column: u32, _main: Option<&Path>) -> Option<String> {
        self.context.clone()
    }

    fn stdlib_roots(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// A session that feeds frames through the real codec into the
/// dispatcher and decodes every outbound frame again.
struct Session {
    dispatcher: Dispatcher,
    last_action: LoopAction,
}

impl Session {
    fn new(root: &Path, oracle: ScriptedOracle) -> Self {
        let server = Server::with_oracle(root, ServerConfig::default(), Box::new(oracle));
        Self {
            dispatcher: Dispatcher::new(server),
            last_action: LoopAction::Continue,
        }
    }

    /// Frame the message, read it back through the codec, dispatch it,
    /// and return the decoded outbound messages.
    fn send(&mut self, message: Value) -> Vec<Value> {
        let bytes = encode_frame(&message);
        let mut reader = FrameReader::new(BufReader::new(bytes.as_slice()));
        let decoded = reader
            .read_frame()
            .expect("frame decode")
            .expect("one frame");

        let (outgoing, action) = self.dispatcher.handle(decoded);
        self.last_action = action;

        // Round-trip the outbound messages through the writer as well
        let mut writer = FrameWriter::new(Vec::new());
        for message in &outgoing {
            writer.write_frame(message).expect("frame encode");
        }
        let bytes = writer.into_inner();
        let mut reader = FrameReader::new(BufReader::new(bytes.as_slice()));
        let mut decoded_out = Vec::new();
        while let Some(message) = reader.read_frame().expect("outbound decode") {
            decoded_out.push(message);
        }
        decoded_out
    }

    fn initialize(&mut self, root: &Path) {
        let root_uri = format!("file://{}", root.display());
        let out = self.send(json!({
            "jsonrpc": "2.0", "id": 0, "method": "initialize",
            "params": {"capabilities": {}, "rootUri": root_uri}
        }));
        assert!(out[0]["result"]["capabilities"].is_object());
        self.send(json!({"jsonrpc": "2.0", "method": "initialized", "params": {}}));
    }

    fn open(&mut self, uri: &str, text: &str) -> Vec<Value> {
        self.send(json!({
            "jsonrpc": "2.0", "method": "textDocument/didOpen",
            "params": {"textDocument": {
                "uri": uri, "languageId": "crystal", "version": 1, "text": text
            }}
        }))
    }
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    dir
}

#[test]
fn full_session_lifecycle() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());

    // The cache directory appears under the workspace root
    assert!(ws.path().join(".liger-cache").is_dir());

    let out = session.open("file:///t.cr", "class A\nend\n");
    assert_eq!(out[0]["method"], "textDocument/publishDiagnostics");
    assert_eq!(out[0]["params"]["diagnostics"], json!([]));

    let out = session.send(json!({"jsonrpc": "2.0", "id": 9, "method": "shutdown"}));
    assert_eq!(out[0]["result"], Value::Null);

    session.send(json!({"jsonrpc": "2.0", "method": "exit"}));
    assert_eq!(session.last_action, LoopAction::Exit(0));
}

#[test]
fn exit_without_shutdown_exits_nonzero() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());
    session.send(json!({"jsonrpc": "2.0", "method": "exit"}));
    assert_eq!(session.last_action, LoopAction::Exit(1));
}

#[test]
fn diagnostics_follow_edits() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());

    let out = session.open("file:///t.cr", "def broken\n");
    let diags = out[0]["params"]["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert!(diags[0]["message"]
        .as_str()
        .unwrap()
        .contains("missing `end`"));

    // Fix the document incrementally: append an `end` line
    let out = session.send(json!({
        "jsonrpc": "2.0", "method": "textDocument/didChange",
        "params": {
            "textDocument": {"uri": "file:///t.cr", "version": 2},
            "contentChanges": [{
                "range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 0}},
                "text": "end\n"
            }]
        }
    }));
    assert_eq!(out[0]["params"]["diagnostics"], json!([]));
}

#[test]
fn definition_resolves_inside_workspace() {
    let ws = workspace();
    std::fs::write(
        ws.path().join("src/widget.cr"),
        "class Widget\n  def render\n  end\nend\n",
    )
    .unwrap();

    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());
    session.open("file:///main.cr", "w = Widget.new\n");

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 4, "method": "textDocument/definition",
        "params": {
            "textDocument": {"uri": "file:///main.cr"},
            "position": {"line": 0, "character": 6}
        }
    }));
    let result = &out[0]["result"];
    assert!(
        result["uri"].as_str().unwrap().ends_with("widget.cr"),
        "unexpected definition target: {result}"
    );
    assert_eq!(result["range"]["start"]["line"], 0);
}

#[test]
fn definition_falls_back_to_oracle() {
    let ws = workspace();
    let target = ws.path().join("src/deep.cr");
    std::fs::write(&target, "def deep_thing\nend\n").unwrap();
    // The open document lives on disk so the pre-oracle flush can succeed
    let main_path = ws.path().join("src/entry.cr");
    std::fs::write(&main_path, "deep_thing\n").unwrap();
    let uri = format!("file://{}", main_path.display());

    let oracle = ScriptedOracle {
        implementations: vec![SourceLocation {
            file: target.clone(),
            line: 1,
            column: 5,
        }],
        context: None,
    };
    let mut session = Session::new(ws.path(), oracle);
    session.initialize(ws.path());
    // A word no local layer can resolve: not defined anywhere in the index
    session.open(&uri, "mystery_call_9000\n");

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 5, "method": "textDocument/definition",
        "params": {
            "textDocument": {"uri": uri},
            "position": {"line": 0, "character": 3}
        }
    }));
    let result = &out[0]["result"];
    assert!(result["uri"].as_str().unwrap().ends_with("deep.cr"));
    // 1-based oracle output converted to 0-based positions
    assert_eq!(result["range"]["start"]["line"], 0);
    assert_eq!(result["range"]["start"]["character"], 4);
}

#[test]
fn completion_and_hover_round_trip() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());
    session.open("file:///t.cr", "arr = [1, 2]\narr.\n");

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 6, "method": "textDocument/completion",
        "params": {
            "textDocument": {"uri": "file:///t.cr"},
            "position": {"line": 1, "character": 4}
        }
    }));
    let labels: Vec<&str> = out[0]["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"each"));
    assert!(labels.contains(&"map"));
    assert!(labels.contains(&"size"));
    assert!(!labels.contains(&"def"));

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 7, "method": "textDocument/hover",
        "params": {
            "textDocument": {"uri": "file:///t.cr"},
            "position": {"line": 0, "character": 1}
        }
    }));
    let contents = out[0]["result"]["contents"]["value"].as_str().unwrap();
    assert!(contents.contains("arr : Array"));
}

#[test]
fn rename_and_references() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());
    session.open("file:///t.cr", "foo = 1\nbar = foo + foo");

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 8, "method": "textDocument/prepareRename",
        "params": {
            "textDocument": {"uri": "file:///t.cr"},
            "position": {"line": 1, "character": 7}
        }
    }));
    assert_eq!(out[0]["result"]["start"]["character"], 6);
    assert_eq!(out[0]["result"]["end"]["character"], 9);

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 9, "method": "textDocument/rename",
        "params": {
            "textDocument": {"uri": "file:///t.cr"},
            "position": {"line": 1, "character": 7},
            "newName": "qux"
        }
    }));
    let edits = out[0]["result"]["changes"]["file:///t.cr"].as_array().unwrap();
    assert_eq!(edits.len(), 3);

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 10, "method": "textDocument/references",
        "params": {
            "textDocument": {"uri": "file:///t.cr"},
            "position": {"line": 1, "character": 7},
            "context": {"includeDeclaration": true}
        }
    }));
    assert_eq!(out[0]["result"].as_array().unwrap().len(), 3);
}

#[test]
fn workspace_symbol_query() {
    let ws = workspace();
    std::fs::write(
        ws.path().join("src/store.cr"),
        "class UserStore\nend\nclass EventStore\nend\n",
    )
    .unwrap();

    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 11, "method": "workspace/symbol",
        "params": {"query": "store"}
    }));
    let names: Vec<&str> = out[0]["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"UserStore"));
    assert!(names.contains(&"EventStore"));
}

#[test]
fn document_symbols_scenario() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());
    session.open(
        "file:///t.cr",
        "module M\n  class C\n    def m\n    end\n  end\nend\n",
    );

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 12, "method": "textDocument/documentSymbol",
        "params": {"textDocument": {"uri": "file:///t.cr"}}
    }));
    let result = &out[0]["result"];
    assert_eq!(result[0]["name"], "M");
    assert_eq!(result[0]["kind"], 2); // Module
    assert_eq!(result[0]["children"][0]["name"], "C");
    assert_eq!(result[0]["children"][0]["kind"], 5); // Class
    assert_eq!(result[0]["children"][0]["children"][0]["name"], "m");
    // selectionRange covers the name token exactly
    let sel = &result[0]["children"][0]["children"][0]["selectionRange"];
    assert_eq!(sel["start"]["character"], 8);
    assert_eq!(sel["end"]["character"], 9);
}

#[test]
fn malformed_method_answers_method_not_found() {
    let ws = workspace();
    let mut session = Session::new(ws.path(), ScriptedOracle::silent());
    session.initialize(ws.path());

    let out = session.send(json!({
        "jsonrpc": "2.0", "id": 13, "method": "textDocument/folding", "params": {}
    }));
    assert_eq!(out[0]["error"]["code"], -32601);
}
