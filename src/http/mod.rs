//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa el subconjunto de HTTP/1.1 que habla el servidor, sin
//! librerías de alto nivel:
//!
//! - `stream`: lector de bytes con buffer sobre el socket
//! - `parser`: request line, headers y body
//! - `response`: serialización de la respuesta
//! - `context`: lo que ve un handler
//!
//! ## Subconjunto soportado
//!
//! - Solo `GET` y `POST`, solo `HTTP/1.1`
//! - Body únicamente con `Content-Length` (sin chunked)
//! - Sin keep-alive: toda respuesta lleva `Connection: close`
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```

pub mod context;
pub mod headers;
pub mod parser;
pub mod query;
pub mod request;
pub mod response;
pub mod status;
pub mod stream;

pub use context::{Handler, HandlerResult, RequestContext};
pub use headers::{Header, HeaderList};
pub use parser::RequestParser;
pub use query::QueryParams;
pub use request::{Method, ParseError, Request};
pub use response::{ResponseError, ResponseWriter, WriteStage};
pub use status::StatusCode;
pub use stream::{ByteStream, StreamError};

// Límites del protocolo

/// Largo máximo del path (sin query)
pub const MAX_PATH_LEN: usize = 127;

/// Cantidad máxima de headers por request
pub const MAX_HEADERS: usize = 32;

pub const MAX_HEADER_KEY_LEN: usize = 31;
pub const MAX_HEADER_VALUE_LEN: usize = 511;

/// Tamaño del buffer de lectura por conexión
pub const READ_BUFFER_SIZE: usize = 8192;

/// Largo máximo de una línea del head (request line o header)
pub const MAX_LINE_LEN: usize = 8192;

/// Body máximo aceptado por defecto (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
