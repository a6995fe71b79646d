//! Liger: a language server for Crystal.
//!
//! Speaks LSP over stdio. All logging goes to stderr; stdout carries
//! only protocol frames.

use std::env;
use std::io::{stdin, stdout};
use std::process::ExitCode;

use liger_core::LigerError;
use liger_server::dispatch::{parse_error_response, Dispatcher, LoopAction};
use liger_server::transport::{FrameReader, FrameWriter};
use liger_server::{Server, ServerConfig};
use log::{error, info, warn};

const USAGE: &str = "\
Usage: liger [OPTIONS]

A language server for Crystal, speaking LSP over stdio.

Options:
  --strict         Enable stricter advisory diagnostics
  -v, --version    Print the version and exit
  -h, --help       Print this help and exit
";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = ServerConfig::default();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--version" => {
                println!("liger {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "-h" | "--help" => {
                print!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            "--strict" => {
                config.strict = true;
            }
            other => {
                eprintln!("liger: unknown option `{other}`\n");
                eprint!("{USAGE}");
                return ExitCode::from(2);
            }
        }
    }

    let root = env::current_dir().unwrap_or_else(|_| ".".into());
    if let Err(err) = std::fs::create_dir_all(root.join(".liger-cache")) {
        warn!("cannot create .liger-cache: {err}");
    }

    info!("liger {} starting on stdio", env!("CARGO_PKG_VERSION"));

    let server = Server::new(root, config);
    let mut dispatcher = Dispatcher::new(server);

    let stdin = stdin();
    let stdout = stdout();
    let mut reader = FrameReader::new(stdin.lock());
    let mut writer = FrameWriter::new(stdout.lock());

    loop {
        let message = match reader.read_frame() {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("stdin closed, shutting down");
                return ExitCode::SUCCESS;
            }
            Err(err @ LigerError::Json(_)) | Err(err @ LigerError::MalformedFrame { .. }) => {
                warn!("protocol error: {err}");
                if writer.write_frame(&parse_error_response(&err)).is_err() {
                    return ExitCode::FAILURE;
                }
                continue;
            }
            Err(err) => {
                error!("transport failure: {err}");
                return ExitCode::FAILURE;
            }
        };

        let (outgoing, action) = dispatcher.handle(message);
        for message in outgoing {
            if let Err(err) = writer.write_frame(&message) {
                error!("cannot write to stdout: {err}");
                return ExitCode::FAILURE;
            }
        }

        if let LoopAction::Exit(code) = action {
            return ExitCode::from(code.clamp(0, u8::MAX as i32) as u8);
        }
    }
}
