//! # Handlers de ejemplo
//! src/handlers/mod.rs
//!
//! Rutas que usa el binario de demostración. Comparten un `AppState` con
//! un número global y el collector de métricas del servidor.

pub mod basic;

use crate::metrics::MetricsCollector;
use crate::server::Server;
use std::sync::atomic::{AtomicI64, Ordering};

pub use basic::{echo, index, metrics, not_found, set_number, status};

/// Contexto de aplicación de la demo
#[derive(Default)]
pub struct AppState {
    number: AtomicI64,
    metrics: MetricsCollector,
}

impl AppState {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self {
            number: AtomicI64::new(0),
            metrics,
        }
    }

    pub fn number(&self) -> i64 {
        self.number.load(Ordering::Acquire)
    }

    pub fn set_number(&self, value: i64) {
        self.number.store(value, Ordering::Release);
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

/// Registra todas las rutas de la demo
pub fn register(server: &mut Server<AppState>) {
    server.get("/", index);
    server.post("/set_number", set_number);
    server.post("/echo", echo);
    server.get("/status", status);
    server.get("/metrics", metrics);
    server.set_not_found(not_found);
}
