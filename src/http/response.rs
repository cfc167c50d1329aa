//! Ordered response serialization.
//!
//! [`ResponseWriter`] wraps an output sink and enforces the wire order of an
//! HTTP/1.1 response: status line, then headers, then body. The body stage is
//! terminal and repeatable, covering plain bodies, chunked transfer coding,
//! and trailing headers. Calling a stage out of order fails with
//! [`HttpError::WriterStateViolation`] and performs no I/O.

use std::fmt;

use async_std::io::Write;
use async_std::prelude::*;

use crate::http::HttpError;
use crate::http::headers::Headers;
use crate::http::status::StatusCode;

/// Write progress: each stage entered at most once, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    StatusLine,
    Headers,
    Body,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::StatusLine => "status line",
            WriterState::Headers => "headers",
            WriterState::Body => "body",
        };
        f.write_str(name)
    }
}

/// Default response headers for a plain body of `content_length` bytes.
///
/// Callers may [`replace`](Headers::replace) or [`remove`](Headers::remove)
/// entries before writing, e.g. swapping `content-length` for
/// `transfer-encoding: chunked`.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", &content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
    chunks_terminated: bool,
}

impl<W: Write + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::StatusLine,
            chunks_terminated: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn expect_state(&self, expected: WriterState) -> Result<(), HttpError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HttpError::WriterStateViolation {
                expected,
                actual: self.state,
            })
        }
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    ///
    /// Codes outside the status table get an empty reason phrase.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), HttpError> {
        self.expect_state(WriterState::StatusLine)?;
        let line = format!("HTTP/1.1 {} {}\r\n", status, status.reason_phrase());
        self.sink.write_all(line.as_bytes()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    /// Writes every header in iteration order, then the blank terminator line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), HttpError> {
        self.expect_state(WriterState::Headers)?;
        let mut out = String::new();
        for (name, value) in headers.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        self.sink.write_all(out.as_bytes()).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Writes raw body bytes, returning the count written. Repeatable.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, HttpError> {
        self.expect_state(WriterState::Body)?;
        self.sink.write_all(body).await?;
        Ok(body.len())
    }

    /// Writes one chunked-transfer-coding unit: hex length, CRLF, the bytes,
    /// CRLF.
    ///
    /// An empty `chunk` emits the zero-length terminal chunk instead; exactly
    /// one such call must end every chunked body, before any trailers.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, HttpError> {
        self.expect_state(WriterState::Body)?;
        if chunk.is_empty() {
            self.write_chunk_terminator().await?;
            return Ok(0);
        }
        let size_line = format!("{:x}\r\n", chunk.len());
        self.sink.write_all(size_line.as_bytes()).await?;
        self.sink.write_all(chunk).await?;
        self.sink.write_all(b"\r\n").await?;
        Ok(chunk.len())
    }

    /// Writes trailer fields after a chunked body, then the blank terminator
    /// line. Emits the zero-length chunk first if it has not been written yet.
    ///
    /// Trailers must have been announced in a `Trailer:` header; that is the
    /// caller's contract, not checked here.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), HttpError> {
        self.expect_state(WriterState::Body)?;
        self.write_chunk_terminator().await?;
        let mut out = String::new();
        for (name, value) in trailers.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        self.sink.write_all(out.as_bytes()).await?;
        Ok(())
    }

    async fn write_chunk_terminator(&mut self) -> Result<(), HttpError> {
        if !self.chunks_terminated {
            self.sink.write_all(b"0\r\n").await?;
            self.chunks_terminated = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::find_crlf;
    use async_std::io::Cursor;
    use async_std::task;

    fn writer() -> ResponseWriter<Cursor<Vec<u8>>> {
        ResponseWriter::new(Cursor::new(Vec::new()))
    }

    fn written(w: ResponseWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        w.into_inner().into_inner()
    }

    #[test]
    fn status_line_for_known_code() {
        let mut w = writer();
        task::block_on(w.write_status_line(StatusCode::OK)).unwrap();
        assert_eq!(written(w), b"HTTP/1.1 200 OK\r\n");
    }

    #[test]
    fn status_line_for_unknown_code_has_empty_reason() {
        let mut w = writer();
        task::block_on(w.write_status_line(StatusCode(418))).unwrap();
        assert_eq!(written(w), b"HTTP/1.1 418 \r\n");
    }

    #[test]
    fn default_headers_serialize_in_order() {
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&default_headers(5)).await
        })
        .unwrap();

        assert_eq!(
            written(w),
            b"HTTP/1.1 200 OK\r\n\
              content-length: 5\r\n\
              connection: close\r\n\
              content-type: text/plain\r\n\
              \r\n"
        );
    }

    #[test]
    fn headers_before_status_line_fails_without_io() {
        let mut w = writer();
        let err = task::block_on(w.write_headers(&Headers::new())).unwrap_err();

        assert!(matches!(
            err,
            HttpError::WriterStateViolation {
                expected: WriterState::Headers,
                actual: WriterState::StatusLine,
            }
        ));
        assert!(written(w).is_empty());
    }

    #[test]
    fn body_before_headers_fails() {
        let mut w = writer();
        task::block_on(w.write_status_line(StatusCode::OK)).unwrap();
        let err = task::block_on(w.write_body(b"hi")).unwrap_err();
        assert!(matches!(err, HttpError::WriterStateViolation { .. }));
    }

    #[test]
    fn status_line_cannot_be_written_twice() {
        let mut w = writer();
        task::block_on(w.write_status_line(StatusCode::OK)).unwrap();
        let err = task::block_on(w.write_status_line(StatusCode::OK)).unwrap_err();
        assert!(matches!(err, HttpError::WriterStateViolation { .. }));
    }

    #[test]
    fn plain_body_round_trips_through_header_parsing() {
        let body = b"hello body!";
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&default_headers(body.len())).await?;
            w.write_body(body).await
        })
        .unwrap();
        let wire = written(w);

        // Re-read the emitted bytes: skip the status line, then reuse the
        // incremental header parser and the declared length to recover the body.
        let mut rest = &wire[find_crlf(&wire).unwrap() + 2..];
        let mut headers = Headers::new();
        loop {
            let (consumed, done) = headers.parse_line(rest).unwrap();
            rest = &rest[consumed..];
            if done {
                break;
            }
        }
        let declared: usize = headers.get("content-length").unwrap().parse().unwrap();
        assert_eq!(declared, body.len());
        assert_eq!(rest, body);
    }

    #[test]
    fn chunked_body_wire_format() {
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            let mut h = default_headers(0);
            h.remove("content-length");
            h.set("Transfer-Encoding", "chunked");
            w.write_headers(&h).await?;
            w.write_chunked_body(b"hello").await?;
            w.write_chunked_body(b"world!").await?;
            w.write_chunked_body(b"").await
        })
        .unwrap();

        let wire = written(w);
        let tail = b"5\r\nhello\r\n6\r\nworld!\r\n0\r\n";
        assert!(wire.ends_with(tail));
    }

    #[test]
    fn chunk_terminator_is_written_once() {
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&Headers::new()).await?;
            w.write_chunked_body(b"").await?;
            w.write_chunked_body(b"").await
        })
        .unwrap();

        let wire = written(w);
        let zero_chunks = wire
            .windows(3)
            .filter(|window| window == b"0\r\n")
            .count();
        assert_eq!(zero_chunks, 1);
    }

    #[test]
    fn chunked_stream_reassembles_exactly() {
        let pieces: [&[u8]; 4] = [b"alpha", b"beta", b"gamma-gamma", b"d"];
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&Headers::new()).await?;
            for piece in pieces {
                w.write_chunked_body(piece).await?;
            }
            w.write_chunked_body(b"").await
        })
        .unwrap();
        let wire = written(w);

        // Decode the chunk stream from the blank line after the headers.
        let headers_end = wire.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let mut rest = &wire[headers_end..];
        let mut payload = Vec::new();
        let mut saw_terminator = false;
        while !rest.is_empty() {
            let line_end = find_crlf(rest).unwrap();
            let declared =
                usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap(), 16)
                    .unwrap();
            rest = &rest[line_end + 2..];
            if declared == 0 {
                saw_terminator = true;
                break;
            }
            payload.extend_from_slice(&rest[..declared]);
            assert_eq!(&rest[declared..declared + 2], b"\r\n");
            rest = &rest[declared + 2..];
        }

        assert!(saw_terminator);
        assert_eq!(payload, pieces.concat());
    }

    #[test]
    fn trailers_follow_the_terminator_chunk() {
        let mut w = writer();
        task::block_on(async {
            w.write_status_line(StatusCode::OK).await?;
            let mut h = default_headers(0);
            h.remove("content-length");
            h.set("Transfer-Encoding", "chunked");
            h.set("Trailer", "X-Content-Length");
            w.write_headers(&h).await?;
            w.write_chunked_body(b"hello").await?;

            let mut trailers = Headers::new();
            trailers.set("X-Content-Length", "5");
            w.write_trailers(&trailers).await
        })
        .unwrap();

        let wire = written(w);
        assert!(wire.ends_with(b"5\r\nhello\r\n0\r\nx-content-length: 5\r\n\r\n"));
    }

    #[test]
    fn trailers_require_body_state() {
        let mut w = writer();
        let err = task::block_on(w.write_trailers(&Headers::new())).unwrap_err();
        assert!(matches!(err, HttpError::WriterStateViolation { .. }));
    }
}
