//! # Parser de Requests HTTP/1.1
//! src/http/parser.rs
//!
//! Consume un `ByteStream` y produce un `Request` validado. El parser lee
//! directamente del socket, línea por línea, así que no necesita tener el
//! request completo en memoria antes de empezar.
//!
//! Cualquier violación de formato o de límites aborta el request completo;
//! el worker decide qué responder (ver `server::worker`).

use super::headers::HeaderList;
use super::request::{Method, ParseError, Request};
use super::stream::ByteStream;
use super::{
    DEFAULT_MAX_BODY_BYTES, MAX_HEADERS, MAX_HEADER_KEY_LEN, MAX_HEADER_VALUE_LEN, MAX_LINE_LEN,
    MAX_PATH_LEN,
};
use std::io::Read;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Bytes de una línea inválida que se citan en el error
const ERROR_EXCERPT_LEN: usize = 32;

/// Parser de requests con límite de body configurable
#[derive(Debug, Clone, Copy)]
pub struct RequestParser {
    max_body_bytes: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_BYTES)
    }
}

impl RequestParser {
    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Lee un request completo del stream
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::http::{ByteStream, Method, RequestParser};
    ///
    /// let raw: &[u8] = b"GET /a/b?x=1 HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let mut stream = ByteStream::new(raw);
    /// let request = RequestParser::default().parse(&mut stream).unwrap();
    ///
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.path(), "/a/b");
    /// assert_eq!(request.query(), Some("x=1"));
    /// ```
    pub fn parse<S: Read>(&self, stream: &mut ByteStream<S>) -> Result<Request, ParseError> {
        // 1. Request line
        let line = stream.next_line_bounded(MAX_LINE_LEN)?;
        let (method, path, query) = parse_request_line(&line)?;

        // 2. Headers hasta la línea vacía
        let headers = self.parse_headers(stream)?;

        // 3. Body (solo POST)
        let body = match method {
            Method::GET => None,
            Method::POST => Some(self.read_body(stream, &headers)?),
        };

        Ok(Request::new(method, path, query, headers, body))
    }

    fn parse_headers<S: Read>(&self, stream: &mut ByteStream<S>) -> Result<HeaderList, ParseError> {
        let mut headers = HeaderList::new();
        loop {
            let line = stream.next_line_bounded(MAX_LINE_LEN)?;
            if line.is_empty() {
                return Ok(headers);
            }
            if headers.len() == MAX_HEADERS {
                return Err(ParseError::TooManyHeaders(MAX_HEADERS));
            }
            let (key, value) = parse_header_line(&line)?;
            headers.push(key, value);
        }
    }

    fn read_body<S: Read>(
        &self,
        stream: &mut ByteStream<S>,
        headers: &HeaderList,
    ) -> Result<Vec<u8>, ParseError> {
        let raw = headers
            .get("Content-Length")
            .ok_or(ParseError::MissingContentLength)?;
        let declared: usize = raw
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;

        if declared > self.max_body_bytes {
            return Err(ParseError::BodyTooLarge {
                declared,
                max: self.max_body_bytes,
            });
        }

        Ok(stream.next_bytes(declared)?)
    }
}

/// Parsea `METHOD target HTTP/1.1`
///
/// Retorna método, path y query (sin `?`). El fragmento (`#...`) se descarta.
fn parse_request_line(line: &[u8]) -> Result<(Method, String, Option<String>), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    // Separado por espacios simples: exactamente 3 tokens
    let mut tokens = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::InvalidRequestLine);
    };

    if version != HTTP_VERSION {
        return Err(ParseError::InvalidHttpVersion(version.to_string()));
    }

    let method = Method::from_token(method)?;

    if target.is_empty() {
        return Err(ParseError::InvalidRequestLine);
    }

    let target = target.split_once('#').map_or(target, |(before, _)| before);
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };

    if path.len() > MAX_PATH_LEN {
        return Err(ParseError::PathTooLong(path.len()));
    }

    Ok((method, path.to_string(), query))
}

/// Parsea `Key: Value`
///
/// La clave va hasta el primer `:` (1..=31 bytes). Al valor se le quitan los
/// espacios iniciales y debe medir 1..=511 bytes.
fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    let Some((key, value)) = line.split_once(':') else {
        return Err(ParseError::InvalidHeader(excerpt(line)));
    };

    if key.is_empty() || key.len() > MAX_HEADER_KEY_LEN {
        return Err(ParseError::HeaderKeyLength(key.len()));
    }

    let value = value.trim_start_matches(' ');
    if value.is_empty() || value.len() > MAX_HEADER_VALUE_LEN {
        return Err(ParseError::HeaderValueLength(value.len()));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Primeros bytes de `line` (cortando en un límite de carácter)
fn excerpt(line: &str) -> String {
    if line.len() <= ERROR_EXCERPT_LEN {
        return line.to_string();
    }
    let mut end = ERROR_EXCERPT_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &line[..end], line.len())
}
