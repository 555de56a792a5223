//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a un handler.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler(ctx) → ResponseWriter
//! ```
//!
//! - Coincidencia exacta de método y path, sin comodines ni parámetros
//! - Búsqueda lineal en orden de registro: gana la primera ruta
//! - Si nada coincide se usa el handler de "no encontrado", si hay uno
//!
//! Las rutas se registran antes de arrancar el servidor. Después el router
//! se comparte entre workers con `Arc` y solo se lee.

use crate::http::{Handler, Method, Request};
use std::fmt;

/// Una ruta registrada
pub struct Route<A> {
    method: Method,
    path: String,
    handler: Handler<A>,
}

impl<A> Route<A> {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

/// Resultado de buscar un handler para un request
pub enum Dispatch<A> {
    /// Una ruta registrada coincide
    Matched(Handler<A>),

    /// Ninguna coincide, se usa el handler de "no encontrado"
    Fallback(Handler<A>),

    /// Ninguna coincide y no hay handler de "no encontrado"
    Unmatched,
}

/// Router que mapea (método, path) a handlers
pub struct Router<A> {
    routes: Vec<Route<A>>,
    not_found: Option<Handler<A>>,
}

impl<A> Router<A> {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: None,
        }
    }

    /// Registra una ruta con su handler
    ///
    /// Registrar dos veces la misma ruta no falla, pero la segunda nunca
    /// se alcanza.
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::http::{HandlerResult, Method, RequestContext, StatusCode};
    /// use pool_http::router::Router;
    ///
    /// fn hello(ctx: &mut RequestContext<'_, ()>) -> HandlerResult {
    ///     ctx.respond_str(StatusCode::Ok, "hello")
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", hello);
    /// assert!(router.find(Method::GET, "/hello").is_some());
    /// assert!(router.find(Method::POST, "/hello").is_none());
    /// ```
    pub fn register(&mut self, method: Method, path: &str, handler: Handler<A>) {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler,
        });
    }

    pub fn get(&mut self, path: &str, handler: Handler<A>) {
        self.register(Method::GET, path, handler);
    }

    pub fn post(&mut self, path: &str, handler: Handler<A>) {
        self.register(Method::POST, path, handler);
    }

    /// Handler para requests que no coinciden con ninguna ruta
    pub fn set_not_found(&mut self, handler: Handler<A>) {
        self.not_found = Some(handler);
    }

    /// Primera ruta registrada para (método, path)
    pub fn find(&self, method: Method, path: &str) -> Option<Handler<A>> {
        self.routes
            .iter()
            .find(|route| route.matches(method, path))
            .map(|route| route.handler)
    }

    /// Decide qué handler atiende el request
    pub fn dispatch(&self, request: &Request) -> Dispatch<A> {
        match (self.find(request.method(), request.path()), self.not_found) {
            (Some(handler), _) => Dispatch::Matched(handler),
            (None, Some(handler)) => Dispatch::Fallback(handler),
            (None, None) => Dispatch::Unmatched,
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route<A>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<A> Default for Router<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Router<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| format!("{} {}", r.method, r.path))
                    .collect::<Vec<_>>(),
            )
            .field("not_found", &self.not_found.is_some())
            .finish()
    }
}
