use std::fmt;

use async_std::io::Read;
use async_std::prelude::*;

use crate::http::HttpError;
use crate::http::find_crlf;
use crate::http::request::{Request, RequestLine};

const INITIAL_BUFFER_SIZE: usize = 1024;

/// Parse progress, strictly forward, no cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::Initialized => "the request line",
            ParserState::ParsingHeaders => "headers",
            ParserState::ParsingBody => "the body",
            ParserState::Done => "nothing (request complete)",
        };
        f.write_str(name)
    }
}

/// Incremental request parser.
///
/// [`feed`](RequestParser::feed) accepts arbitrarily small chunks and reports
/// how many bytes it consumed; the caller keeps the unconsumed tail and never
/// re-presents consumed bytes. A parse error is fatal and leaves the parser
/// unusable for further input.
pub struct RequestParser {
    state: ParserState,
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Initialized,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Advances the parse as far as the given bytes allow.
    ///
    /// Returns the number of bytes consumed; the remainder must be handed
    /// back on the next call, prefixed to any newly arrived bytes.
    pub fn feed(&mut self, req: &mut Request, data: &[u8]) -> Result<usize, HttpError> {
        if self.state == ParserState::Done {
            return Err(HttpError::ParseAfterDone);
        }

        let mut consumed = 0;
        while self.state != ParserState::Done {
            let n = self.parse_single(req, &data[consumed..])?;
            if n == 0 {
                break;
            }
            consumed += n;
        }
        Ok(consumed)
    }

    fn parse_single(&mut self, req: &mut Request, data: &[u8]) -> Result<usize, HttpError> {
        match self.state {
            ParserState::Initialized => match parse_request_line(data)? {
                None => Ok(0),
                Some((request_line, consumed)) => {
                    req.request_line = request_line;
                    self.state = ParserState::ParsingHeaders;
                    Ok(consumed)
                }
            },
            ParserState::ParsingHeaders => {
                let (consumed, done) = req.headers.parse_line(data)?;
                if done {
                    self.state = ParserState::ParsingBody;
                }
                Ok(consumed)
            }
            ParserState::ParsingBody => {
                // No content-length means no body; whatever bytes remain
                // belong to the transport, not to this request.
                let Some(value) = req.headers.get("content-length") else {
                    self.state = ParserState::Done;
                    return Ok(0);
                };
                let declared: usize = value
                    .parse()
                    .map_err(|_| HttpError::InvalidContentLength(value.to_string()))?;

                req.body.extend_from_slice(data);
                if req.body.len() > declared {
                    return Err(HttpError::BodyOverflow);
                }
                if req.body.len() == declared {
                    self.state = ParserState::Done;
                }
                Ok(data.len())
            }
            ParserState::Done => Err(HttpError::ParseAfterDone),
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, HttpError> {
    let Some(line_end) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..line_end])
        .map_err(|_| HttpError::MalformedRequestLine("not valid UTF-8".to_string()))?;

    let parts: Vec<&str> = line.split(' ').collect();
    let (method, target, version) = match parts.as_slice() {
        [method, target, version] => (*method, *target, *version),
        _ => {
            return Err(HttpError::MalformedRequestLine(format!(
                "expected 3 space-separated fields in {line:?}"
            )));
        }
    };

    let Some(version) = version.strip_prefix("HTTP/") else {
        return Err(HttpError::MalformedRequestLine(format!(
            "unrecognized version field {version:?}"
        )));
    };
    if version != "1.1" {
        return Err(HttpError::MalformedRequestLine(format!(
            "unsupported HTTP version {version:?}"
        )));
    }

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(HttpError::MalformedRequestLine(format!(
            "invalid method {method:?}"
        )));
    }

    let request_line = RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
    };
    Ok(Some((request_line, line_end + 2)))
}

/// Reads a complete request from `reader`.
///
/// Bytes are read into a growable buffer (doubled when full) and fed to the
/// parser; the buffer is compacted by the consumed amount after every pass.
/// End of stream before the parser is done is an [`HttpError::IncompleteMessage`].
pub async fn from_stream<R: Read + Unpin>(mut reader: R) -> Result<Request, HttpError> {
    let mut parser = RequestParser::new();
    let mut req = Request::new();
    let mut buf = vec![0u8; INITIAL_BUFFER_SIZE];
    let mut filled = 0;

    while !parser.is_done() {
        if filled == buf.len() {
            buf.resize(buf.len() * 2, 0);
        }

        let n = match reader.read(&mut buf[filled..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HttpError::Transport(e)),
        };
        if n == 0 {
            return Err(HttpError::IncompleteMessage(parser.state()));
        }
        filled += n;

        let consumed = parser.feed(&mut req, &buf[..filled])?;
        buf.copy_within(consumed..filled, 0);
        filled -= consumed;
    }

    Ok(req)
}
