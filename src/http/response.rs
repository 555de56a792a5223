//! # Escritura de Respuestas HTTP/1.1
//! src/http/response.rs
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n      <- headers del handler, en orden
//! Content-Length: 13\r\n                  <- siempre calculado acá
//! Connection: close\r\n                   <- siempre, no hay keep-alive
//! \r\n
//! {"ok": true}
//! ```
//!
//! La cabecera (status line + headers + línea vacía) sale en un `write` y el
//! body en otro. Un `write` parcial se reporta y no se reintenta.

use super::headers::HeaderList;
use super::StatusCode;
use std::fmt;
use std::io::{self, ErrorKind, Write};

/// Parte de la respuesta que se estaba escribiendo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Head,
    Body,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Head => f.write_str("head"),
            WriteStage::Body => f.write_str("body"),
        }
    }
}

/// Errores al responder
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("send failed: {0}")]
    Io(#[from] io::Error),

    #[error("short write on {stage}: {written} of {expected} bytes")]
    ShortWrite {
        stage: WriteStage,
        written: usize,
        expected: usize,
    },

    /// Solo se puede responder una vez por request
    #[error("response already sent")]
    AlreadyResponded,

    #[error("header contains CR or LF: {0:?}")]
    InvalidHeader(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Headers salientes y estado de una respuesta
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderList,
    sent: Option<StatusCode>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un header saliente; los duplicados se envían todos
    ///
    /// Rechaza claves o valores con CR/LF para que un handler no pueda
    /// inyectar líneas en la respuesta.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<(), ResponseError> {
        for part in [key, value] {
            if part.contains(&['\r', '\n'][..]) {
                return Err(ResponseError::InvalidHeader(part.to_string()));
            }
        }
        self.headers.push(key, value);
        Ok(())
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Código enviado, si ya se respondió
    pub fn status(&self) -> Option<StatusCode> {
        self.sent
    }

    pub fn is_sent(&self) -> bool {
        self.sent.is_some()
    }

    /// Escribe la respuesta completa en `out`
    ///
    /// Cualquier `Content-Length` o `Connection` que haya puesto el handler
    /// se descarta y se reemplaza por los valores calculados.
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::http::{ResponseWriter, StatusCode};
    ///
    /// let mut out: Vec<u8> = Vec::new();
    /// let mut response = ResponseWriter::new();
    /// response.set_header("Content-Type", "text/plain").unwrap();
    /// response.send(&mut out, StatusCode::Ok, b"hi").unwrap();
    ///
    /// assert_eq!(
    ///     out,
    ///     b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi"
    /// );
    /// ```
    pub fn send<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        status: StatusCode,
        body: &[u8],
    ) -> Result<(), ResponseError> {
        if self.sent.is_some() {
            return Err(ResponseError::AlreadyResponded);
        }
        // Se marca antes de escribir: una respuesta fallida tampoco se repite
        self.sent = Some(status);

        self.headers.remove("Content-Length");
        self.headers.remove("Connection");
        self.headers.push("Content-Length", body.len().to_string());
        self.headers.push("Connection", "close");

        let head = serialize_head(status, &self.headers);
        write_once(out, &head, WriteStage::Head)?;
        if !body.is_empty() {
            write_once(out, body, WriteStage::Body)?;
        }
        Ok(())
    }
}

/// Status line, headers y línea vacía
pub fn serialize_head(status: StatusCode, headers: &HeaderList) -> Vec<u8> {
    format!("HTTP/1.1 {}\r\n{}\r\n", status, headers).into_bytes()
}

/// Un único `write` (solo se repite si lo interrumpe una señal)
fn write_once<W: Write + ?Sized>(
    out: &mut W,
    bytes: &[u8],
    stage: WriteStage,
) -> Result<(), ResponseError> {
    let written = loop {
        match out.write(bytes) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ResponseError::Io(e)),
        }
    };
    if written < bytes.len() {
        return Err(ResponseError::ShortWrite {
            stage,
            written,
            expected: bytes.len(),
        });
    }
    Ok(())
}
