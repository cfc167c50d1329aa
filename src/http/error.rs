use thiserror::Error;

use crate::http::parser::ParserState;
use crate::http::response::WriterState;

/// Errors produced by the request parser, the response writer, and the
/// transport they run over.
///
/// Parse errors are fatal for the connection: the server answers with a
/// `400 Bad Request` carrying the error message and closes. Writer state
/// violations are caller bugs and perform no I/O.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    #[error("malformed header field: {0}")]
    MalformedHeaderField(String),

    #[error("connection closed before message was complete, while parsing {0}")]
    IncompleteMessage(ParserState),

    #[error("request body exceeds declared content-length")]
    BodyOverflow,

    #[error("invalid content-length value: {0:?}")]
    InvalidContentLength(String),

    #[error("incorrect writer state: expected {expected}, writer is in {actual}")]
    WriterStateViolation {
        expected: WriterState,
        actual: WriterState,
    },

    #[error("cannot feed data to an already completed request")]
    ParseAfterDone,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
