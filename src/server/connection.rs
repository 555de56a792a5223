//! # Conexiones aceptadas
//! src/server/connection.rs
//!
//! Una `Connection` es el socket de un cliente más su dirección remota. La
//! crea el acceptor, pasa por la cola y termina en un único worker, que la
//! cierra al terminar. Nunca se comparte.
//!
//! El socket va detrás del trait `Transport` para que los tests puedan
//! inyectar sockets en memoria.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// Socket bidireccional que se puede cerrar
pub trait Transport: Read + Write + Send + 'static {
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // El peer ya se fue
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

pub struct Connection {
    id: u64,
    stream: Box<dyn Transport>,
    peer: Option<SocketAddr>,
}

impl Connection {
    pub fn new(id: u64, stream: Box<dyn Transport>, peer: Option<SocketAddr>) -> Self {
        Self { id, stream, peer }
    }

    /// Envuelve un socket recién aceptado y le aplica los timeouts
    ///
    /// `None` deja el socket sin timeout.
    pub fn from_tcp(
        id: u64,
        stream: TcpStream,
        peer: SocketAddr,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> io::Result<Self> {
        stream.set_read_timeout(read_timeout)?;
        stream.set_write_timeout(write_timeout)?;
        Ok(Self::new(id, Box::new(stream), Some(peer)))
    }

    /// Número de conexión asignado por el acceptor
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Cierra ambos sentidos del socket y consume la conexión
    pub fn close(mut self) -> io::Result<()> {
        self.stream.close()
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
