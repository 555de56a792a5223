//! # Rutas de la demo
//! src/handlers/basic.rs
//!
//! - `GET /`: página HTML con el número compartido
//! - `POST /set_number`: cambia el número con `{"value": n}`
//! - `POST /echo`: devuelve el body tal cual
//! - `GET /status`: estado del servidor
//! - `GET /metrics`: snapshot de métricas
//! - fallback: 404 en JSON o HTML según `Accept`

use super::AppState;
use crate::http::{HandlerResult, RequestContext, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct Reply<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<&'a str>,
}

impl<'a> Reply<'a> {
    fn ok() -> Self {
        Self { ok: true, msg: None }
    }

    fn fail(msg: &'a str) -> Self {
        Self {
            ok: false,
            msg: Some(msg),
        }
    }
}

/// Handler para `GET /`
pub fn index(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let page = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
         <body><h1>Number = {}</h1></body></html>",
        ctx.app().number()
    );
    ctx.set_header("Content-Type", "text/html; charset=utf-8")?;
    ctx.respond_str(StatusCode::Ok, &page)
}

/// Handler para `POST /set_number`
///
/// # Ejemplo de request
/// ```json
/// { "value": 42 }
/// ```
///
/// Sin la clave `value` responde 200 con `ok: false`; un body que no es
/// JSON o un valor que no es entero es un 400.
pub fn set_number(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let body: Value = match serde_json::from_slice(ctx.body()) {
        Ok(body) => body,
        Err(_) => return ctx.respond_json(StatusCode::BadRequest, &Reply::fail("invalid JSON")),
    };

    let value = match body.get("value") {
        Some(value) => value,
        None => return ctx.respond_json(StatusCode::Ok, &Reply::fail("no 'value' key")),
    };

    match value.as_i64() {
        Some(n) => {
            ctx.app().set_number(n);
            ctx.respond_json(StatusCode::Ok, &Reply::ok())
        }
        None => ctx.respond_json(
            StatusCode::BadRequest,
            &Reply::fail("'value' must be an integer"),
        ),
    }
}

/// Handler para `POST /echo`
///
/// Respeta el `Content-Type` del request.
pub fn echo(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let content_type = ctx.header("Content-Type").unwrap_or("application/octet-stream");
    ctx.set_header("Content-Type", content_type)?;
    let body = ctx.body();
    ctx.respond(StatusCode::Ok, body)
}

/// Handler para `GET /status`
pub fn status(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let state = ctx.app();
    let snapshot = state.metrics().snapshot();
    ctx.respond_json(
        StatusCode::Ok,
        &json!({
            "status": "running",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": snapshot.uptime_secs,
            "busy_workers": snapshot.busy_workers,
            "number": state.number(),
        }),
    )
}

/// Handler para `GET /metrics`
pub fn metrics(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let snapshot = ctx.app().metrics().snapshot();
    ctx.respond_json(StatusCode::Ok, &snapshot)
}

/// Fallback para rutas no registradas
pub fn not_found(ctx: &mut RequestContext<'_, AppState>) -> HandlerResult {
    let wants_json = ctx
        .header("Accept")
        .is_some_and(|accept| accept.trim().eq_ignore_ascii_case("application/json"));

    if wants_json {
        let path = ctx.path();
        return ctx.respond_json(
            StatusCode::NotFound,
            &json!({ "ok": false, "msg": "404 Not Found", "path": path }),
        );
    }

    let page = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
         <body style=\"text-align: center;\"><h1>404 Not Found</h1>\
         <code style=\"font-size: 1rem;\">{} {}</code></body></html>",
        ctx.request().method(),
        escape_html(ctx.path())
    );
    ctx.set_header("Content-Type", "text/html; charset=utf-8")?;
    ctx.respond_str(StatusCode::NotFound, &page)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
