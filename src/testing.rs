//! # Utilidades de prueba
//! src/testing.rs
//!
//! Socket en memoria para inyectar en el lector, el parser y los workers.
//! Cada chunk se entrega en un `read` distinto, así se simulan requests que
//! llegan partidos en varios paquetes.

use crate::server::connection::{Connection, Transport};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockStream {
    chunks: VecDeque<Vec<u8>>,
    read_error: Option<ErrorKind>,
    write_limit: Option<usize>,
    output: Arc<Mutex<Vec<u8>>>,
    write_calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockStream {
    pub fn new(chunks: &[&str]) -> Self {
        Self::from_chunks(chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }

    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            read_error: None,
            write_limit: None,
            output: Arc::new(Mutex::new(Vec::new())),
            write_calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cuando se acaben los chunks, los reads fallan con `kind` en vez de EOF
    pub fn fail_reads_with(mut self, kind: ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    /// Cada `write` acepta como máximo `limit` bytes
    pub fn limit_writes(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            output: Arc::clone(&self.output),
            write_calls: Arc::clone(&self.write_calls),
            closed: Arc::clone(&self.closed),
        }
    }

    pub fn into_connection(self, id: u64) -> Connection {
        Connection::new(id, Box::new(self), None)
    }
}

/// Vista de lo que el servidor escribió en el socket
#[derive(Clone)]
pub struct MockHandle {
    output: Arc<Mutex<Vec<u8>>>,
    write_calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockHandle {
    pub fn written(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }

    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written()).to_string()
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return match self.read_error {
                Some(kind) => Err(io::Error::new(kind, "mock read failure")),
                None => Ok(0),
            };
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.output.lock().unwrap().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
