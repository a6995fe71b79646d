//! JSON-RPC framing over stdio.
//!
//! LSP frames are `Content-Length: N\r\n\r\n{json}`. [`FrameReader`] and
//! [`FrameWriter`] work over any `BufRead`/`Write` pair so tests can
//! drive the server through in-memory pipes.

use std::io::{BufRead, Read, Write};

use liger_core::{LigerError, LigerResult};

/// Maximum frame size (16 MiB) to keep a corrupt header from allocating
/// unbounded memory.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Reads JSON-RPC frames.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame. `Ok(None)` signals EOF (clean shutdown).
    pub fn read_frame(&mut self) -> LigerResult<Option<serde_json::Value>> {
        let content_length = match self.read_headers()? {
            Some(length) => length,
            None => return Ok(None),
        };

        if content_length > MAX_FRAME_BYTES {
            return Err(LigerError::MalformedFrame {
                message: format!("Content-Length {content_length} exceeds {MAX_FRAME_BYTES}"),
            });
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body)?;

        let value = serde_json::from_slice(&body)?;
        Ok(Some(value))
    }

    /// Parse the header block up to the blank separator line. Headers
    /// other than `Content-Length` are ignored.
    fn read_headers(&mut self) -> LigerResult<Option<usize>> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut saw_any_bytes = false;

        loop {
            line.clear();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                if saw_any_bytes {
                    return Err(LigerError::MalformedFrame {
                        message: "EOF inside header block".into(),
                    });
                }
                return Ok(None);
            }
            saw_any_bytes = true;

            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                return match content_length {
                    Some(length) => Ok(Some(length)),
                    None => Err(LigerError::MalformedFrame {
                        message: "missing Content-Length header".into(),
                    }),
                };
            }

            if let Some((name, value)) = trimmed.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    let parsed =
                        value
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| LigerError::MalformedFrame {
                                message: format!("bad Content-Length: {}", value.trim()),
                            })?;
                    content_length = Some(parsed);
                }
            }
        }
    }
}

/// Writes JSON-RPC frames.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize and frame one message, flushing immediately.
    pub fn write_frame(&mut self, message: &serde_json::Value) -> LigerResult<()> {
        let body = serde_json::to_string(message)?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", body.len())?;
        self.writer.write_all(body.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Frame a message into a byte buffer, for tests and tooling.
pub fn encode_frame(message: &serde_json::Value) -> Vec<u8> {
    let body = message.to_string();
    let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(body.as_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use liger_core::ErrorCode;
    use serde_json::json;
    use std::io::{BufReader, Cursor};

    fn reader(bytes: &[u8]) -> FrameReader<BufReader<Cursor<Vec<u8>>>> {
        FrameReader::new(BufReader::new(Cursor::new(bytes.to_vec())))
    }

    #[test]
    fn test_round_trip_through_writer_and_reader() {
        let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});

        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(&message).unwrap();
        let bytes = writer.into_inner();

        let mut r = reader(&bytes);
        let decoded = r.read_frame().unwrap().unwrap();
        assert_eq!(decoded, message);
        // Then clean EOF
        assert!(r.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_eof_before_any_header_is_clean() {
        let mut r = reader(b"");
        assert!(r.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_extra_headers_ignored() {
        let body = br#"{"jsonrpc":"2.0","method":"initialized"}"#;
        let mut framed = format!(
            "Content-Type: application/vscode-jsonrpc\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        framed.extend_from_slice(body);

        let decoded = reader(&framed).read_frame().unwrap().unwrap();
        assert_eq!(decoded["method"], "initialized");
    }

    #[test]
    fn test_missing_content_length_is_error() {
        let mut r = reader(b"Content-Type: text\r\n\r\n{}");
        let error = r.read_frame().unwrap_err();
        assert_eq!(error.error_code(), ErrorCode::ParseError);
    }

    #[test]
    fn test_invalid_json_body_is_parse_error() {
        let mut framed = b"Content-Length: 5\r\n\r\n".to_vec();
        framed.extend_from_slice(b"{oops");
        let error = reader(&framed).read_frame().unwrap_err();
        assert_eq!(error.error_code(), ErrorCode::ParseError);
    }

    #[test]
    fn test_body_length_measured_in_bytes() {
        // Multibyte content: the frame length is byte length, not chars
        let message = json!({"value": "héllo"});
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(&message).unwrap();
        let bytes = writer.into_inner();

        let decoded = reader(&bytes).read_frame().unwrap().unwrap();
        assert_eq!(decoded["value"], "héllo");
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let a = json!({"id": 1});
        let b = json!({"id": 2});
        let mut bytes = encode_frame(&a);
        bytes.extend(encode_frame(&b));

        let mut r = reader(&bytes);
        assert_eq!(r.read_frame().unwrap().unwrap()["id"], 1);
        assert_eq!(r.read_frame().unwrap().unwrap()["id"], 2);
        assert!(r.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut r = reader(format!("Content-Length: {}\r\n\r\n", MAX_FRAME_BYTES + 1).as_bytes());
        assert!(r.read_frame().is_err());
    }
}
