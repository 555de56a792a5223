//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Dueño del socket de escucha, la cola, el pool y el router. El thread que
//! llama a `run` es el acceptor:
//!
//! ```text
//!  accept() ──▶ Connection ──push──▶ ConnectionQueue ──pop──▶ worker-N
//!                                    (cola llena: block | 503)
//! ```
//!
//! Las rutas y el contexto de aplicación se configuran antes de `run`. Una
//! vez arrancado, el router solo se lee.

use super::connection::Connection;
use super::pool::WorkerPool;
use super::queue::{ConnectionQueue, QueueError};
use super::worker::{handle_connection, WorkerContext};
use crate::config::{Config, QueueFullPolicy};
use crate::http::{Handler, Method, RequestParser, ResponseError, ResponseWriter, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::Router;
use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pausa tras el primer error de `accept`; se duplica hasta `MAX_ACCEPT_BACKOFF`
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Errores al levantar el servidor
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("bind failed on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to start workers: {0}")]
    Workers(#[source] io::Error),
}

/// Detiene un servidor que está corriendo en otro thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    queue: Arc<ConnectionQueue<Connection>>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Pide que el servidor se detenga
    ///
    /// Marca el flag, cierra la cola (un acceptor esperando lugar en
    /// `push_blocking` se despierta) y se conecta al propio listener para
    /// sacarlo del `accept` bloqueante.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }
        self.queue.close();
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            debug!("No se pudo despertar al acceptor: {}", e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("shutdown", &self.is_shutdown())
            .field("wake_addr", &self.wake_addr)
            .finish_non_exhaustive()
    }
}

/// Servidor HTTP/1.1 con pool de workers
pub struct Server<A> {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router<A>,
    app: Arc<A>,
    metrics: MetricsCollector,
    queue: Arc<ConnectionQueue<Connection>>,
    shutdown: Arc<AtomicBool>,
}

impl<A: Send + Sync + 'static> Server<A> {
    /// Valida la configuración y abre el socket de escucha
    ///
    /// El socket queda escuchando (con `SO_REUSEADDR` y el backlog
    /// configurado) pero no se acepta nada hasta `run`.
    pub fn bind(config: Config, app: A) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;

        let address = config.address();
        let addr = address
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses found")
                })
            })
            .map_err(|source| ServerError::Resolve {
                addr: address.clone(),
                source,
            })?;

        let listener = listen(addr, config.backlog).map_err(|source| ServerError::Bind {
            addr,
            source,
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!("Socket escuchando en {} (backlog {})", local_addr, config.backlog);

        let queue = Arc::new(ConnectionQueue::new(config.queue_capacity));
        Ok(Self {
            config,
            listener,
            local_addr,
            router: Router::new(),
            app: Arc::new(app),
            metrics: MetricsCollector::new(),
            queue,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn register(&mut self, method: Method, path: &str, handler: Handler<A>) {
        self.router.register(method, path, handler);
    }

    pub fn get(&mut self, path: &str, handler: Handler<A>) {
        self.router.get(path, handler);
    }

    pub fn post(&mut self, path: &str, handler: Handler<A>) {
        self.router.post(path, handler);
    }

    pub fn set_not_found(&mut self, handler: Handler<A>) {
        self.router.set_not_found(handler);
    }

    /// Reemplaza el contexto de aplicación que ven los handlers
    pub fn set_app_context(&mut self, app: A) {
        self.app = Arc::new(app);
    }

    /// Usa un collector de métricas compartido
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            queue: Arc::clone(&self.queue),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Lanza los workers y corre el loop de accept hasta el shutdown
    pub fn run(self) -> Result<(), ServerError> {
        let Server {
            config,
            listener,
            local_addr,
            router,
            app,
            metrics,
            queue,
            shutdown,
        } = self;

        let ctx = Arc::new(
            WorkerContext::new(
                Arc::new(router),
                app,
                RequestParser::new(config.max_body_bytes),
            )
            .with_metrics(metrics.clone()),
        );
        let mut pool = WorkerPool::spawn(config.workers, Arc::clone(&queue), {
            let ctx = Arc::clone(&ctx);
            move |conn| handle_connection(&*ctx, conn)
        })
        .map_err(ServerError::Workers)?;

        info!("Servidor escuchando en http://{}", local_addr);

        let mut next_id: u64 = 0;
        let mut backoff = ACCEPT_BACKOFF;
        loop {
            let accepted = listener.accept();
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            let (stream, peer) = match accepted {
                Ok(pair) => {
                    backoff = ACCEPT_BACKOFF;
                    pair
                }
                Err(e) => {
                    // EMFILE y compañía no se arreglan reintentando en seguida
                    error!("Error al aceptar conexión: {} (reintento en {:?})", e, backoff);
                    thread::sleep(backoff);
                    backoff = next_backoff(backoff);
                    continue;
                }
            };

            next_id += 1;
            let conn = match Connection::from_tcp(
                next_id,
                stream,
                peer,
                config.read_timeout(),
                config.write_timeout(),
            ) {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("No se pudo configurar la conexión desde {}: {}", peer, e);
                    continue;
                }
            };

            debug!("Conexión {} desde {}", next_id, peer);
            metrics.record_accepted();
            enqueue(&queue, conn, config.queue_full, &metrics);
        }

        info!("Deteniendo servidor...");
        pool.shutdown();
        info!("Servidor detenido");
        Ok(())
    }
}

/// Socket de escucha con `SO_REUSEADDR` y backlog explícito
fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    Ok(socket.into())
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_ACCEPT_BACKOFF)
}

/// Dirección a la que conectarse para despertar al acceptor
fn wake_addr(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port())
        }
        _ => local,
    }
}

fn enqueue(
    queue: &ConnectionQueue<Connection>,
    conn: Connection,
    policy: QueueFullPolicy,
    metrics: &MetricsCollector,
) {
    let result = match policy {
        QueueFullPolicy::Block => queue.push_blocking(conn),
        QueueFullPolicy::Reject => queue.push(conn),
    };

    match result {
        Ok(()) => {}
        Err(QueueError::Full { item, capacity }) => {
            warn!(
                "Cola llena ({} slots): rechazando conexión {}",
                capacity,
                item.id()
            );
            metrics.record_rejected();
            reject(item);
        }
        Err(QueueError::Closed(item)) => {
            debug!("Cola cerrada: descartando conexión {}", item.id());
            if let Err(e) = item.close() {
                debug!("Error al cerrar: {}", e);
            }
        }
    }
}

/// 503 con `Retry-After` y cierre
fn reject(mut conn: Connection) {
    let id = conn.id();
    if let Err(e) = send_unavailable(&mut conn) {
        warn!("Conexión {}: no se pudo enviar 503: {}", id, e);
    }
    if let Err(e) = conn.close() {
        debug!("Conexión {}: error al cerrar: {}", id, e);
    }
}

fn send_unavailable(conn: &mut Connection) -> Result<(), ResponseError> {
    let mut response = ResponseWriter::new();
    response.set_header("Content-Type", "application/json")?;
    response.set_header("Retry-After", "1")?;
    response.send(
        conn,
        StatusCode::ServiceUnavailable,
        br#"{"error":"server busy"}"#,
    )
}
