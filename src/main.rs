//! # pool_http - Entry Point
//! src/main.rs
//!
//! Servidor de demostración: una página con un número compartido, una ruta
//! para cambiarlo y rutas de estado y métricas.
//!
//! ```bash
//! RUST_LOG=debug ./pool_http --port 8080 --workers 8
//! curl -X POST -d '{"value": 42}' http://127.0.0.1:8080/set_number
//! ```

use log::error;
use pool_http::config::Config;
use pool_http::handlers::{self, AppState};
use pool_http::metrics::MetricsCollector;
use pool_http::server::{Server, ServerError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Config::new()) {
        error!("Error fatal: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), ServerError> {
    config.validate().map_err(ServerError::Config)?;
    config.log_summary();

    let metrics = MetricsCollector::new();
    let mut server =
        Server::bind(config, AppState::new(metrics.clone()))?.with_metrics(metrics);
    handlers::register(&mut server);
    server.run()
}
