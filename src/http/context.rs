//! # Contexto de un request
//! src/http/context.rs
//!
//! Lo que recibe un handler: el request parseado, el socket para responder,
//! los headers salientes y el contexto compartido de la aplicación.
//!
//! Un contexto vive lo que dura un request. Se crea en el worker después de
//! parsear y se descarta cuando el handler retorna.

use super::query::QueryParams;
use super::request::Request;
use super::response::{ResponseError, ResponseWriter};
use super::StatusCode;
use serde::Serialize;
use std::io::Write;
use std::net::SocketAddr;

/// Resultado de un handler
pub type HandlerResult = Result<(), ResponseError>;

/// Firma de un handler de ruta
///
/// `A` es el contexto de aplicación registrado en el servidor.
pub type Handler<A> = fn(&mut RequestContext<'_, A>) -> HandlerResult;

pub struct RequestContext<'a, A> {
    request: &'a Request,
    out: &'a mut dyn Write,
    response: ResponseWriter,
    app: &'a A,
    peer: Option<SocketAddr>,
}

impl<'a, A> RequestContext<'a, A> {
    pub fn new(
        request: &'a Request,
        out: &'a mut dyn Write,
        app: &'a A,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            request,
            out,
            response: ResponseWriter::new(),
            app,
            peer,
        }
    }

    /// Contexto compartido de la aplicación
    pub fn app(&self) -> &'a A {
        self.app
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn path(&self) -> &'a str {
        self.request.path()
    }

    pub fn query(&self) -> Option<&'a str> {
        self.request.query()
    }

    pub fn query_params(&self) -> QueryParams<'a> {
        self.request.query_params()
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.request.has_header(key)
    }

    pub fn header(&self, key: &str) -> Option<&'a str> {
        self.request.header(key)
    }

    pub fn body(&self) -> &'a [u8] {
        self.request.body()
    }

    pub fn body_size(&self) -> usize {
        self.request.body_size()
    }

    pub fn body_str(&self) -> Option<&'a str> {
        self.request.body_str()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Agrega un header a la respuesta
    pub fn set_header(&mut self, key: &str, value: &str) -> HandlerResult {
        self.response.set_header(key, value)
    }

    /// Envía la respuesta: status line, headers y body
    pub fn respond(&mut self, status: StatusCode, body: &[u8]) -> HandlerResult {
        self.response.send(&mut *self.out, status, body)
    }

    pub fn respond_str(&mut self, status: StatusCode, body: &str) -> HandlerResult {
        self.respond(status, body.as_bytes())
    }

    /// Serializa `value` y responde con `Content-Type: application/json`
    pub fn respond_json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        value: &T,
    ) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.set_header("Content-Type", "application/json")?;
        self.respond(status, &body)
    }

    /// Código enviado, si el handler ya respondió
    pub fn status(&self) -> Option<StatusCode> {
        self.response.status()
    }

    pub fn responded(&self) -> bool {
        self.response.is_sent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HeaderList, Method};
    use serde_json::json;

    fn request(method: Method, path: &str, query: Option<&str>, body: Option<&[u8]>) -> Request {
        let headers: HeaderList = vec![("Host", "x"), ("Accept", "text/html")]
            .into_iter()
            .collect();
        Request::new(
            method,
            path,
            query.map(str::to_string),
            headers,
            body.map(<[u8]>::to_vec),
        )
    }

    #[test]
    fn test_accessors() {
        let req = request(Method::POST, "/echo", Some("a=1&b"), Some(&b"hola"[..]));
        let mut out: Vec<u8> = Vec::new();
        let app = 7u32;
        let ctx = RequestContext::new(&req, &mut out, &app, None);

        assert_eq!(*ctx.app(), 7);
        assert_eq!(ctx.path(), "/echo");
        assert_eq!(ctx.query(), Some("a=1&b"));
        assert_eq!(ctx.query_params().get("a"), Some("1"));
        assert!(ctx.has_header("accept"));
        assert_eq!(ctx.header("HOST"), Some("x"));
        assert_eq!(ctx.body(), b"hola");
        assert_eq!(ctx.body_size(), 4);
        assert_eq!(ctx.body_str(), Some("hola"));
        assert_eq!(ctx.peer_addr(), None);
        assert!(!ctx.responded());
    }

    #[test]
    fn test_respond_writes_to_socket() {
        let req = request(Method::GET, "/", None, None);
        let mut out: Vec<u8> = Vec::new();
        {
            let mut ctx = RequestContext::new(&req, &mut out, &(), None);
            ctx.set_header("X-Test", "1").unwrap();
            ctx.respond_str(StatusCode::Ok, "hi").unwrap();
            assert_eq!(ctx.status(), Some(StatusCode::Ok));
            assert!(matches!(
                ctx.respond_str(StatusCode::Ok, "again"),
                Err(ResponseError::AlreadyResponded)
            ));
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nX-Test: 1\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi"
        );
    }

    #[test]
    fn test_respond_json() {
        let req = request(Method::GET, "/status", None, None);
        let mut out: Vec<u8> = Vec::new();
        {
            let mut ctx = RequestContext::new(&req, &mut out, &(), None);
            ctx.respond_json(StatusCode::Created, &json!({"value": 5})).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.ends_with(r#"{"value":5}"#));
    }

    #[test]
    fn test_invalid_header_does_not_respond() {
        let req = request(Method::GET, "/", None, None);
        let mut out: Vec<u8> = Vec::new();
        let mut ctx = RequestContext::new(&req, &mut out, &(), None);
        assert!(ctx.set_header("X", "a\nb").is_err());
        assert!(!ctx.responded());
    }
}
