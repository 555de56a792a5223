//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección y agregación de métricas del servidor:
//! - Conexiones aceptadas, rechazadas y caídas
//! - Requests por código de estado y por ruta
//! - Latencias (p50, p95, p99)
//! - Workers ocupados

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
