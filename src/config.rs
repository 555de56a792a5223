//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./pool_http --port 8080 \
//!   --workers 16 \
//!   --queue-capacity 4096 \
//!   --queue-full reject
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 WORKERS=16 ./pool_http
//! ```

use crate::http::DEFAULT_MAX_BODY_BYTES;
use crate::server::queue::QUEUE_CAPACITY;
use clap::{Parser, ValueEnum};
use log::info;
use std::fmt;
use std::time::Duration;

/// Qué hace el acceptor cuando la cola de conexiones está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueFullPolicy {
    /// Esperar a que un worker libere un lugar
    Block,
    /// Responder 503 y cerrar
    Reject,
}

impl fmt::Display for QueueFullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueFullPolicy::Block => f.write_str("block"),
            QueueFullPolicy::Reject => f.write_str("reject"),
        }
    }
}

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "pool_http")]
#[command(about = "Servidor HTTP/1.1 con cola acotada y pool de workers")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Workers y cola ===
    /// Número de workers
    #[arg(short, long, default_value = "8", env = "WORKERS")]
    pub workers: usize,

    /// Slots de la cola de conexiones (entran capacity - 1)
    #[arg(long = "queue-capacity", default_value_t = QUEUE_CAPACITY, env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Qué hacer cuando la cola está llena
    #[arg(long = "queue-full", value_enum, default_value_t = QueueFullPolicy::Block, env = "QUEUE_FULL_POLICY")]
    pub queue_full: QueueFullPolicy,

    /// Backlog del listen()
    #[arg(long, default_value = "128", env = "LISTEN_BACKLOG")]
    pub backlog: u32,

    // === Timeouts ===
    /// Timeout de lectura por conexión en milisegundos (0 = sin timeout)
    #[arg(long = "read-timeout-ms", default_value = "30000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Timeout de escritura por conexión en milisegundos (0 = sin timeout)
    #[arg(long = "write-timeout-ms", default_value = "30000", env = "WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: u64,

    // === Límites ===
    /// Body máximo aceptado en bytes
    #[arg(long = "max-body-bytes", default_value_t = DEFAULT_MAX_BODY_BYTES, env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use pool_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }
        if self.queue_capacity < 2 {
            return Err("Queue capacity must be >= 2".to_string());
        }
        if self.backlog == 0 || self.backlog > i32::MAX as u32 {
            return Err("Listen backlog must be between 1 and i32::MAX".to_string());
        }
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        Ok(())
    }

    /// Resumen de la configuración en el log
    pub fn log_summary(&self) {
        info!("Configuración:");
        info!("   Dirección:      {}", self.address());
        info!("   Workers:        {}", self.workers);
        info!(
            "   Cola:           {} slots (cola llena: {})",
            self.queue_capacity, self.queue_full
        );
        info!("   Backlog:        {}", self.backlog);
        info!(
            "   Timeouts:       lectura {}, escritura {}",
            describe_timeout(self.read_timeout_ms),
            describe_timeout(self.write_timeout_ms)
        );
        info!("   Body máximo:    {} bytes", self.max_body_bytes);
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn describe_timeout(ms: u64) -> String {
    if ms == 0 {
        "desactivado".to_string()
    } else {
        format!("{} ms", ms)
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 8,
            queue_capacity: QUEUE_CAPACITY,
            queue_full: QueueFullPolicy::Block,
            backlog: 128,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workers, 8);
        assert_eq!(config.queue_capacity, 8192);
        assert_eq!(config.queue_full, QueueFullPolicy::Block);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_cli_defaults_match_default() {
        let parsed = Config::try_parse_from(["pool_http"]).unwrap();
        let default = Config::default();
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.workers, default.workers);
        assert_eq!(parsed.queue_capacity, default.queue_capacity);
        assert_eq!(parsed.queue_full, default.queue_full);
        assert_eq!(parsed.read_timeout_ms, default.read_timeout_ms);
        assert_eq!(parsed.max_body_bytes, default.max_body_bytes);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::try_parse_from([
            "pool_http",
            "--port",
            "3000",
            "--workers",
            "2",
            "--queue-full",
            "reject",
            "--read-timeout-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_full, QueueFullPolicy::Reject);
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        assert!(Config::try_parse_from(["pool_http", "--queue-full", "drop"]).is_err());
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeouts() {
        let mut config = Config::default();
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
        config.write_timeout_ms = 0;
        assert_eq!(config.write_timeout(), None);
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        assert!(config.validate().unwrap_err().contains("Workers"));
    }

    #[test]
    fn test_validate_queue_capacity() {
        let mut config = Config::default();
        config.queue_capacity = 1;
        assert!(config.validate().unwrap_err().contains("Queue capacity"));

        config.queue_capacity = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_backlog() {
        let mut config = Config::default();
        config.backlog = 0;
        assert!(config.validate().unwrap_err().contains("backlog"));
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = Config::default();
        config.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_summary() {
        // No debe entrar en pánico sin logger instalado
        Config::default().log_summary();
    }
}
