//! # pool_http
//! src/lib.rs
//!
//! Servidor HTTP/1.1 implementado desde cero: un acceptor, una cola acotada
//! de conexiones y un pool fijo de workers que parsean y despachan cada
//! request. Toda respuesta cierra la conexión.
//!
//! ## Arquitectura
//!
//! - `http`: lectura del socket, parseo de requests y escritura de respuestas
//! - `router`: rutas exactas (método, path) y handler de fallback
//! - `server`: listener, cola, pool de workers y atención de conexiones
//! - `config`: argumentos CLI y variables de entorno
//! - `metrics`: contadores y latencias
//! - `handlers`: rutas del binario de demostración
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use pool_http::config::Config;
//! use pool_http::http::{HandlerResult, RequestContext, StatusCode};
//! use pool_http::server::Server;
//!
//! fn hello(ctx: &mut RequestContext<'_, ()>) -> HandlerResult {
//!     ctx.respond_str(StatusCode::Ok, "hola")
//! }
//!
//! let mut server = Server::bind(Config::default(), ()).unwrap();
//! server.get("/", hello);
//! server.run().unwrap();
//! ```

pub mod config;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;

#[cfg(test)]
mod testing;
