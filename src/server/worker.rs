//! # Atención de una conexión
//! src/server/worker.rs
//!
//! Lo que hace un worker con cada conexión que saca de la cola:
//!
//! 1. Parsear el request directamente del socket
//! 2. Si el request es inválido responder 400 (413 si el body es muy grande)
//! 3. Buscar el handler en el router y ejecutarlo
//! 4. Si nada coincide y no hay fallback responder 404
//! 5. Registrar métricas y cerrar la conexión
//!
//! Un request que no llega completo (el peer cerró o expiró el timeout) se
//! descarta sin responder.

use super::connection::Connection;
use crate::http::{
    ByteStream, Handler, ParseError, Request, RequestContext, RequestParser, ResponseError,
    ResponseWriter, StatusCode,
};
use crate::metrics::collector::OTHER_PATHS;
use crate::metrics::MetricsCollector;
use crate::router::{Dispatch, Router};
use log::{debug, error, warn};
use serde_json::json;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Todo lo que un worker necesita para atender conexiones
pub struct WorkerContext<A> {
    router: Arc<Router<A>>,
    app: Arc<A>,
    parser: RequestParser,
    metrics: MetricsCollector,
}

impl<A> WorkerContext<A> {
    pub fn new(router: Arc<Router<A>>, app: Arc<A>, parser: RequestParser) -> Self {
        Self {
            router,
            app,
            parser,
            metrics: MetricsCollector::new(),
        }
    }

    /// Usa un collector compartido (por ejemplo con los handlers)
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

/// Atiende una conexión completa y la cierra
pub fn handle_connection<A>(ctx: &WorkerContext<A>, mut conn: Connection) {
    let start = Instant::now();
    ctx.metrics.increment_busy_workers();

    let parsed = ctx.parser.parse(&mut ByteStream::new(&mut conn));
    match parsed {
        Ok(request) => {
            debug!(
                "conexión {}: {} {}",
                conn.id(),
                request.method(),
                request.path()
            );
            let (status, matched) = serve(ctx, &request, &mut conn);
            // Solo las rutas registradas tienen contador propio
            let key = if matched { request.path() } else { OTHER_PATHS };
            ctx.metrics.record_request(key, status.as_u16(), start.elapsed());
        }
        Err(e) if e.is_transport() => {
            debug!("conexión {}: request incompleto: {}", conn.id(), e);
            ctx.metrics.record_dropped();
        }
        Err(e) => {
            warn!("conexión {}: request inválido: {}", conn.id(), e);
            ctx.metrics.record_parse_failure();
            let status = e.status();
            if let Err(err) = respond_parse_error(&mut conn, &e) {
                warn!("conexión {}: no se pudo enviar {}: {}", conn.id(), status, err);
            }
            ctx.metrics
                .record_request(OTHER_PATHS, status.as_u16(), start.elapsed());
        }
    }

    let id = conn.id();
    if let Err(e) = conn.close() {
        debug!("conexión {}: error al cerrar: {}", id, e);
    }
    ctx.metrics.decrement_busy_workers();
}

/// Despacha el request
///
/// Retorna el código que recibió el cliente y si coincidió una ruta
/// registrada.
fn serve<A>(
    ctx: &WorkerContext<A>,
    request: &Request,
    conn: &mut Connection,
) -> (StatusCode, bool) {
    let id = conn.id();
    let peer = conn.peer_addr();
    let mut rc = RequestContext::new(request, conn, &*ctx.app, peer);

    let (handler, matched) = match ctx.router.dispatch(request) {
        Dispatch::Matched(handler) => (handler, true),
        Dispatch::Fallback(handler) => (handler, false),
        Dispatch::Unmatched => {
            let result = rc.respond_json(
                StatusCode::NotFound,
                &json!({ "error": "not found", "path": request.path() }),
            );
            log_send_error(id, result);
            return (StatusCode::NotFound, false);
        }
    };

    run_handler(id, handler, &mut rc);
    (rc.status().unwrap_or(StatusCode::InternalServerError), matched)
}

/// Ejecuta el handler; si entra en pánico o no responde se envía 500
fn run_handler<A>(id: u64, handler: Handler<A>, rc: &mut RequestContext<'_, A>) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *rc))) {
        Ok(result) => log_send_error(id, result),
        Err(_) => error!("conexión {}: pánico en handler de {}", id, rc.path()),
    }

    if !rc.responded() {
        warn!("conexión {}: el handler de {} no respondió", id, rc.path());
        let result = rc.respond_json(
            StatusCode::InternalServerError,
            &json!({ "error": "internal server error" }),
        );
        log_send_error(id, result);
    }
}

fn respond_parse_error(conn: &mut Connection, e: &ParseError) -> Result<(), ResponseError> {
    let body = serde_json::to_vec(&json!({ "error": e.to_string() }))?;
    let mut response = ResponseWriter::new();
    response.set_header("Content-Type", "application/json")?;
    response.send(conn, e.status(), &body)
}

fn log_send_error(id: u64, result: Result<(), ResponseError>) {
    match result {
        Ok(()) => {}
        Err(ResponseError::ShortWrite {
            stage,
            written,
            expected,
        }) => warn!(
            "conexión {}: escritura parcial en {} ({} de {} bytes)",
            id, stage, written, expected
        ),
        Err(e) => warn!("conexión {}: error al responder: {}", id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HandlerResult;
    use crate::testing::{MockHandle, MockStream};
    use std::io::ErrorKind;

    struct Counter {
        hits: std::sync::atomic::AtomicUsize,
    }

    fn hello(ctx: &mut RequestContext<'_, Counter>) -> HandlerResult {
        ctx.app().hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        ctx.set_header("Content-Type", "text/plain")?;
        ctx.respond_str(StatusCode::Ok, "hello")
    }

    fn echo(ctx: &mut RequestContext<'_, Counter>) -> HandlerResult {
        let body = ctx.body().to_vec();
        ctx.respond(StatusCode::Ok, &body)
    }

    fn panics(_ctx: &mut RequestContext<'_, Counter>) -> HandlerResult {
        panic!("handler roto");
    }

    fn silent(_ctx: &mut RequestContext<'_, Counter>) -> HandlerResult {
        Ok(())
    }

    fn missing(ctx: &mut RequestContext<'_, Counter>) -> HandlerResult {
        ctx.respond_str(StatusCode::NotFound, "custom missing")
    }

    fn context(with_fallback: bool) -> WorkerContext<Counter> {
        let mut router = Router::new();
        router.get("/hello", hello);
        router.post("/echo", echo);
        router.get("/panic", panics);
        router.get("/silent", silent);
        if with_fallback {
            router.set_not_found(missing);
        }
        let app = Counter {
            hits: std::sync::atomic::AtomicUsize::new(0),
        };
        WorkerContext::new(Arc::new(router), Arc::new(app), RequestParser::new(16))
    }

    fn run(ctx: &WorkerContext<Counter>, chunks: &[&str]) -> MockHandle {
        let mock = MockStream::new(chunks);
        let handle = mock.handle();
        handle_connection(ctx, mock.into_connection(1));
        handle
    }

    #[test]
    fn test_matched_route() {
        let ctx = context(false);
        let handle = run(&ctx, &["GET /hello HTTP/1.1\r\nHost: x\r\n\r\n"]);

        assert_eq!(
            handle.written_string(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello"
        );
        assert!(handle.is_closed());
        assert_eq!(ctx.app.hits.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(ctx.metrics().snapshot().requests.total, 1);
        assert_eq!(ctx.metrics().busy_workers(), 0);
    }

    #[test]
    fn test_post_body_reaches_handler() {
        let ctx = context(false);
        let handle = run(
            &ctx,
            &["POST /echo HTTP/1.1\r\nContent-Length: 4\r\n\r\n", "pi", "ng"],
        );
        assert!(handle.written_string().ends_with("Content-Length: 4\r\nConnection: close\r\n\r\nping"));
    }

    #[test]
    fn test_method_mismatch_without_fallback_is_404() {
        let ctx = context(false);
        let handle = run(&ctx, &["POST /hello HTTP/1.1\r\nContent-Length: 0\r\n\r\n"]);

        let text = handle.written_string();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains(r#""path":"/hello""#));
        assert_eq!(ctx.app.hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_handler_used() {
        let ctx = context(true);
        let handle = run(&ctx, &["GET /nothing HTTP/1.1\r\n\r\n"]);
        assert!(handle.written_string().ends_with("custom missing"));
    }

    #[test]
    fn test_unmatched_paths_share_one_counter() {
        let ctx = context(false);
        run(&ctx, &["GET /hello HTTP/1.1\r\n\r\n"]);
        for i in 0..20 {
            let raw = format!("GET /random-{} HTTP/1.1\r\n\r\n", i);
            run(&ctx, &[raw.as_str()]);
        }

        let paths = ctx.metrics().snapshot().requests.top_paths;
        let keys: Vec<&str> = paths.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(keys, vec![OTHER_PATHS, "/hello"]);
        assert_eq!(paths[0].count, 20);
    }

    #[test]
    fn test_fallback_counted_under_shared_key() {
        let ctx = context(true);
        run(&ctx, &["GET /a HTTP/1.1\r\n\r\n"]);
        run(&ctx, &["GET /b HTTP/1.1\r\n\r\n"]);

        let paths = ctx.metrics().snapshot().requests.top_paths;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, OTHER_PATHS);
        assert_eq!(paths[0].count, 2);
    }

    #[test]
    fn test_malformed_request_gets_400() {
        let ctx = context(false);
        let handle = run(&ctx, &["GET / HTTP/1.0\r\n\r\n"]);

        let text = handle.written_string();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Connection: close"));
        assert!(handle.is_closed());
        assert_eq!(ctx.metrics().snapshot().requests.parse_failures, 1);
    }

    #[test]
    fn test_oversized_body_gets_413() {
        let ctx = context(false);
        let handle = run(&ctx, &["POST /echo HTTP/1.1\r\nContent-Length: 17\r\n\r\n"]);
        assert!(handle.written_string().starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[test]
    fn test_incomplete_request_closes_silently() {
        let ctx = context(false);
        let handle = run(&ctx, &["GET /hello HTTP/1.1\r\nHo"]);

        assert!(handle.written().is_empty());
        assert!(handle.is_closed());
        assert_eq!(ctx.metrics().snapshot().connections.dropped, 1);
    }

    #[test]
    fn test_read_timeout_closes_silently() {
        let ctx = context(false);
        let mock = MockStream::new(&["GET /hel"]).fail_reads_with(ErrorKind::WouldBlock);
        let handle = mock.handle();
        handle_connection(&ctx, mock.into_connection(7));

        assert!(handle.written().is_empty());
        assert!(handle.is_closed());
    }

    #[test]
    fn test_panicking_handler_gets_500() {
        let ctx = context(false);
        let handle = run(&ctx, &["GET /panic HTTP/1.1\r\n\r\n"]);

        assert!(handle
            .written_string()
            .starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(handle.is_closed());
        assert_eq!(ctx.metrics().busy_workers(), 0);
    }

    #[test]
    fn test_handler_without_response_gets_500() {
        let ctx = context(false);
        let handle = run(&ctx, &["GET /silent HTTP/1.1\r\n\r\n"]);
        assert!(handle
            .written_string()
            .starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn test_short_write_is_not_retried() {
        let ctx = context(false);
        let mock = MockStream::new(&["GET /hello HTTP/1.1\r\n\r\n"]).limit_writes(8);
        let handle = mock.handle();
        handle_connection(&ctx, mock.into_connection(2));

        assert_eq!(handle.write_calls(), 1);
        assert_eq!(handle.written(), b"HTTP/1.1");
        assert!(handle.is_closed());
    }
}
