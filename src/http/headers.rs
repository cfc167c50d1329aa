//! Header store shared by [`Request`](crate::http::request::Request) parsing and
//! [`ResponseWriter`](crate::http::response::ResponseWriter) output.
//!
//! Field names are stored lower-cased and looked up case-insensitively.
//! Setting a name that is already present appends the new value to the stored
//! one joined by `", "`, so repeated fields (e.g. `Trailer`) accumulate into a
//! single list-valued entry instead of being overwritten.
//!
//! Headers are kept in an ordered map so that serialization emits entries in
//! insertion order.
//!
//! [`Headers::parse_line`] consumes exactly one CRLF-terminated field line at
//! a time and is the incremental building block the request parser loops on.

use indexmap::IndexMap;

use crate::http::HttpError;
use crate::http::find_crlf;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Headers {
    headers: IndexMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Sets a header, combining with any existing value.
    ///
    /// The name is lower-cased before storage. If the name is already present
    /// with a non-empty value, `value` is appended to it joined by `", "`.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.headers.get_mut(&name) {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            Some(existing) => *existing = value.to_string(),
            None => {
                self.headers.insert(name, value.to_string());
            }
        }
    }

    /// Replaces a header value outright, without list combining.
    pub fn replace(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    /// Removes a header, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) {
        self.headers.shift_remove(&name.to_ascii_lowercase());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Parses at most one CRLF-terminated field line from `data`.
    ///
    /// Returns `(consumed, done)`: `(0, false)` when no full line is buffered
    /// yet (the caller must wait for more bytes), `(2, true)` when the line is
    /// the empty end-of-headers terminator. Callers must advance their cursor
    /// by exactly `consumed`; re-invoking on the same slice re-parses the same
    /// line.
    pub fn parse_line(&mut self, data: &[u8]) -> Result<(usize, bool), HttpError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };
        if line_end == 0 {
            return Ok((2, true));
        }

        let line = String::from_utf8_lossy(&data[..line_end]);
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::MalformedHeaderField(format!(
                "missing colon in {line:?}"
            )));
        };

        if name.ends_with(|c: char| c.is_ascii_whitespace()) {
            return Err(HttpError::MalformedHeaderField(format!(
                "whitespace before colon in field name {name:?}"
            )));
        }

        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || !name.bytes().all(is_field_name_char) {
            return Err(HttpError::MalformedHeaderField(format!(
                "invalid field name {name:?}"
            )));
        }

        self.set(&name, value.trim());
        Ok((line_end + 2, false))
    }
}

// Token characters per RFC 9110, after lower-casing.
fn is_field_name_char(b: u8) -> bool {
    b.is_ascii_lowercase()
        || b.is_ascii_digit()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_field_line() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";

        let (consumed, done) = headers.parse_line(data).unwrap();
        assert_eq!(consumed, 23);
        assert!(!done);
        assert_eq!(headers.get("host"), Some("localhost:42069"));
    }

    #[test]
    fn waits_for_full_line() {
        let mut headers = Headers::new();

        let (consumed, done) = headers.parse_line(b"Host: local").unwrap();
        assert_eq!(consumed, 0);
        assert!(!done);
        assert!(headers.is_empty());
    }

    #[test]
    fn empty_line_terminates() {
        let mut headers = Headers::new();

        let (consumed, done) = headers.parse_line(b"\r\ntrailing").unwrap();
        assert_eq!(consumed, 2);
        assert!(done);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.parse_line(b"Content-Length: 13\r\n").unwrap();

        assert_eq!(headers.get("Content-Length"), Some("13"));
        assert_eq!(headers.get("content-length"), Some("13"));
    }

    #[test]
    fn repeated_set_combines_values() {
        let mut headers = Headers::new();
        headers.set("Trailer", "a");
        headers.set("trailer", "b");

        assert_eq!(headers.get("trailer"), Some("a, b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn replace_overwrites() {
        let mut headers = Headers::new();
        headers.set("content-type", "text/plain");
        headers.replace("Content-Type", "text/html");

        assert_eq!(headers.get("content-type"), Some("text/html"));
    }

    #[test]
    fn remove_preserves_order() {
        let mut headers = Headers::new();
        headers.set("a", "1");
        headers.set("b", "2");
        headers.set("c", "3");
        headers.remove("b");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn rejects_whitespace_before_colon() {
        let mut headers = Headers::new();
        let err = headers.parse_line(b"Host : localhost\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedHeaderField(_)));
    }

    #[test]
    fn rejects_invalid_field_name_characters() {
        let mut headers = Headers::new();
        let err = headers.parse_line(b"H@st: localhost\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedHeaderField(_)));
    }

    #[test]
    fn rejects_empty_field_name() {
        let mut headers = Headers::new();
        let err = headers.parse_line(b": no name\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedHeaderField(_)));
    }

    #[test]
    fn rejects_line_without_colon() {
        let mut headers = Headers::new();
        let err = headers.parse_line(b"no colon here\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedHeaderField(_)));
    }
}
