//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Motor de concurrencia del servidor:
//! 1. `tcp`: escucha en un puerto y acepta conexiones
//! 2. `queue`: cola acotada entre el acceptor y los workers
//! 3. `pool`: workers de larga vida que sacan conexiones de la cola
//! 4. `worker`: parseo, despacho y respuesta de una conexión

pub mod connection;
pub mod pool;
pub mod queue;
pub mod tcp;
pub mod worker;

pub use connection::{Connection, Transport};
pub use pool::{WorkerPool, WorkerState};
pub use queue::{ConnectionQueue, QueueError};
pub use tcp::{Server, ServerError, ShutdownHandle};
