//! # Requests HTTP/1.1
//! src/http/request.rs
//!
//! Tipos que produce el parser (ver `parser.rs`).
//!
//! ## Formato de un Request HTTP/1.1
//!
//! ```text
//! POST /path?param1=value1 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.1`
//! 2. **Headers**: Pares `Name: Value` (uno por línea, máximo 32)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: Solo en POST, de largo `Content-Length`

use super::headers::HeaderList;
use super::query::QueryParams;
use super::stream::StreamError;
use super::StatusCode;
use std::fmt;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Enviar datos a un recurso
    POST,
}

impl Method {
    /// Parsea el token de método sin distinguir mayúsculas
    ///
    /// # Errores
    ///
    /// Retorna error si el método no es GET ni POST
    pub fn from_token(token: &str) -> Result<Self, ParseError> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(token.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP/1.1 parseado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,

    /// Path sin query ni fragmento, sin percent-decoding
    path: String,

    /// Query string sin el `?` (None si no había `?`)
    query: Option<String>,

    headers: HeaderList,

    /// Body, solo presente en POST
    body: Option<Vec<u8>>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Falla del socket o línea demasiado larga
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// La request line no tiene exactamente 3 tokens
    #[error("invalid request line")]
    InvalidRequestLine,

    /// Bytes que no son UTF-8 en la request line o en un header
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Solo se acepta `HTTP/1.1`
    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("path too long: {0} bytes")]
    PathTooLong(usize),

    #[error("too many headers (max {0})")]
    TooManyHeaders(usize),

    /// Header sin `:`
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid header key length: {0}")]
    HeaderKeyLength(usize),

    #[error("invalid header value length: {0}")]
    HeaderValueLength(usize),

    /// POST sin `Content-Length`
    #[error("POST request without Content-Length")]
    MissingContentLength,

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("body of {declared} bytes exceeds limit of {max}")]
    BodyTooLarge { declared: usize, max: usize },
}

impl ParseError {
    /// La conexión se cayó o expiró: no tiene sentido responder
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ParseError::Stream(StreamError::Closed) | ParseError::Stream(StreamError::Io(_))
        )
    }

    /// Código con el que se rechaza un request mal formado
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
            _ => StatusCode::BadRequest,
        }
    }
}

impl Request {
    /// Construye un request ya validado
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<String>,
        headers: HeaderList,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            query,
            headers,
            body,
        }
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string cruda (sin el `?`)
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Query string separada en parámetros
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::http::{HeaderList, Method, Request};
    ///
    /// let request = Request::new(Method::GET, "/receipt", Some("id=42".into()), HeaderList::new(), None);
    /// assert_eq!(request.query_params().get("id"), Some("42"));
    /// ```
    pub fn query_params(&self) -> QueryParams<'_> {
        QueryParams::parse(self.query.as_deref().unwrap_or(""))
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Primer header con esa clave (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Body del request (vacío si no hay)
    pub fn body(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }

    pub fn body_size(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Body como texto, si es UTF-8 válido
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}
