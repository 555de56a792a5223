//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas del servidor en tiempo real. Lo comparten el
//! acceptor (conexiones aceptadas/rechazadas) y los workers (requests).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Latencias que se guardan para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Rutas que aparecen en el snapshot
const TOP_PATHS: usize = 10;

/// Rutas distintas que se cuentan por separado
pub const MAX_TRACKED_PATHS: usize = 256;

/// Clave para requests sin ruta propia o fuera del límite de rutas
pub const OTHER_PATHS: &str = "-";

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    /// Conexiones aceptadas por el listener
    accepted: u64,

    /// Conexiones rechazadas con 503 por cola llena
    rejected: u64,

    /// Requests con respuesta (incluye 400/404/500)
    total_requests: u64,

    /// Requests mal formados
    parse_failures: u64,

    /// Conexiones cerradas por el peer o por timeout antes del request
    dropped: u64,

    status_codes: HashMap<u16, u64>,

    /// Latencias en microsegundos, las más viejas al frente
    latencies: VecDeque<u64>,

    requests_per_path: HashMap<String, u64>,

    /// Workers atendiendo una conexión
    busy_workers: u64,
}

/// Snapshot serializable de las métricas
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionStats,
    pub requests: RequestStats,
    pub busy_workers: u64,
    pub latency_us: LatencyStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub accepted: u64,
    pub rejected: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub total: u64,
    pub parse_failures: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_paths: Vec<PathCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un request respondido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.data();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        let key = if data.requests_per_path.contains_key(path)
            || data.requests_per_path.len() < MAX_TRACKED_PATHS
        {
            path
        } else {
            OTHER_PATHS
        };
        *data.requests_per_path.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn record_accepted(&self) {
        self.data().accepted += 1;
    }

    pub fn record_rejected(&self) {
        self.data().rejected += 1;
    }

    pub fn record_parse_failure(&self) {
        self.data().parse_failures += 1;
    }

    pub fn record_dropped(&self) {
        self.data().dropped += 1;
    }

    pub fn increment_busy_workers(&self) {
        self.data().busy_workers += 1;
    }

    pub fn decrement_busy_workers(&self) {
        let mut data = self.data();
        data.busy_workers = data.busy_workers.saturating_sub(1);
    }

    pub fn busy_workers(&self) -> u64 {
        self.data().busy_workers
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();

        let mut paths: Vec<PathCount> = data
            .requests_per_path
            .iter()
            .map(|(path, count)| PathCount {
                path: path.clone(),
                count: *count,
            })
            .collect();
        // Más pedidas primero; a igual cantidad, orden alfabético
        paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        paths.truncate(TOP_PATHS);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            connections: ConnectionStats {
                accepted: data.accepted,
                rejected: data.rejected,
                dropped: data.dropped,
            },
            requests: RequestStats {
                total: data.total_requests,
                parse_failures: data.parse_failures,
                status_codes: data.status_codes.iter().map(|(k, v)| (*k, *v)).collect(),
                top_paths: paths,
            },
            busy_workers: data.busy_workers,
            latency_us: latency_stats(&data.latencies),
        }
    }

    /// Snapshot en JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles, promedio y desviación estándar
fn latency_stats(latencies: &VecDeque<u64>) -> LatencyStats {
    if latencies.is_empty() {
        return LatencyStats::default();
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let avg = sorted.iter().sum::<u64>() / len as u64;
    let variance = sorted
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / len as f64;

    LatencyStats {
        p50: sorted[len * 50 / 100],
        p95: sorted[len * 95 / 100],
        p99: sorted[len * 99 / 100],
        avg,
        stddev: variance.sqrt(),
        samples: len,
    }
}
