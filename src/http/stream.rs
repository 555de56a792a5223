//! # Lector de bytes con buffer
//! src/http/stream.rs
//!
//! Presenta un flujo lógico de bytes sin límite sobre un socket, respaldado
//! por un buffer fijo de `READ_BUFFER_SIZE` bytes. Cuando el buffer se agota
//! se hace exactamente un `read` bloqueante para rellenarlo.
//!
//! ```text
//!  socket ──read()──▶ [ buffer: 8192 bytes ]
//!                        ▲index     ▲filled
//! ```

use super::READ_BUFFER_SIZE;
use std::io::{self, ErrorKind, Read};

/// Errores del lector de bytes
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// El peer cerró la conexión (read devolvió 0)
    #[error("connection closed by peer")]
    Closed,

    /// Error de I/O del socket (incluye timeouts)
    #[error("receive failed: {0}")]
    Io(#[from] io::Error),

    /// Línea más larga que el límite pedido
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),
}

/// Flujo de bytes con buffer sobre un `Read`
pub struct ByteStream<S> {
    inner: S,
    buffer: Box<[u8]>,
    /// Próximo byte a entregar
    index: usize,
    /// Bytes válidos en el buffer
    filled: usize,
}

impl<S: Read> ByteStream<S> {
    /// Crea un lector con el buffer por defecto (8192 bytes)
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, READ_BUFFER_SIZE)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            index: 0,
            filled: 0,
        }
    }

    /// Retorna el siguiente byte del flujo
    ///
    /// Si el buffer está agotado hace un único `read`. Un `read` que
    /// devuelve 0 o un error hace fallar la lectura.
    pub fn next_byte(&mut self) -> Result<u8, StreamError> {
        if self.index >= self.filled {
            self.fill()?;
        }
        let byte = self.buffer[self.index];
        self.index += 1;
        Ok(byte)
    }

    /// Lee hasta `\r\n` y retorna la línea sin el terminador
    ///
    /// No hay límite de longitud en esta capa.
    pub fn next_line(&mut self) -> Result<Vec<u8>, StreamError> {
        self.read_line(None)
    }

    /// Igual que `next_line`, pero falla si la línea supera `max` bytes
    pub fn next_line_bounded(&mut self, max: usize) -> Result<Vec<u8>, StreamError> {
        self.read_line(Some(max))
    }

    /// Lee exactamente `len` bytes, byte a byte
    pub fn next_bytes(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        // No confiar en `len` para reservar memoria: lo declara el cliente
        let mut bytes = Vec::with_capacity(len.min(self.buffer.len()));
        for _ in 0..len {
            bytes.push(self.next_byte()?);
        }
        Ok(bytes)
    }

    fn read_line(&mut self, max: Option<usize>) -> Result<Vec<u8>, StreamError> {
        let mut line = Vec::new();
        let mut last = 0u8;
        loop {
            let byte = self.next_byte()?;
            if last == b'\r' && byte == b'\n' {
                line.pop();
                return Ok(line);
            }
            line.push(byte);
            last = byte;

            // +1 por el '\r' que todavía puede estar al final
            if let Some(max) = max {
                if line.len() > max + 1 {
                    return Err(StreamError::LineTooLong(max));
                }
            }
        }
    }

    fn fill(&mut self) -> Result<(), StreamError> {
        let received = loop {
            match self.inner.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Io(e)),
            }
        };
        if received == 0 {
            return Err(StreamError::Closed);
        }
        self.index = 0;
        self.filled = received;
        Ok(())
    }

    /// Bytes ya recibidos que todavía no se consumieron
    pub fn buffered(&self) -> usize {
        self.filled - self.index
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Acceso mutable al socket
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStream;

    #[test]
    fn test_next_byte_sequence() {
        let mut stream = ByteStream::new(MockStream::new(&["ab"]));
        assert_eq!(stream.next_byte().unwrap(), b'a');
        assert_eq!(stream.next_byte().unwrap(), b'b');
        assert!(matches!(stream.next_byte(), Err(StreamError::Closed)));
    }

    #[test]
    fn test_next_line_strips_crlf() {
        let mut stream = ByteStream::new(MockStream::new(&["GET / HTTP/1.1\r\nHost: x\r\n\r\n"]));
        assert_eq!(stream.next_line().unwrap(), b"GET / HTTP/1.1");
        assert_eq!(stream.next_line().unwrap(), b"Host: x");
        assert_eq!(stream.next_line().unwrap(), b"");
    }

    #[test]
    fn test_line_across_receives() {
        // Cada chunk llega en un read distinto
        let mock = MockStream::new(&["Hos", "t: exa", "mple\r", "\nrest"]);
        let mut stream = ByteStream::new(mock);
        assert_eq!(stream.next_line().unwrap(), b"Host: example");
        assert_eq!(stream.buffered(), 4);
    }

    #[test]
    fn test_line_across_small_buffer() {
        let mock = MockStream::new(&["abcdefghij\r\n"]);
        let mut stream = ByteStream::with_capacity(mock, 3);
        assert_eq!(stream.next_line().unwrap(), b"abcdefghij");
    }

    #[test]
    fn test_lone_cr_is_kept() {
        let mut stream = ByteStream::new(MockStream::new(&["a\rb\r\n"]));
        assert_eq!(stream.next_line().unwrap(), b"a\rb");
    }

    #[test]
    fn test_line_fails_when_peer_closes() {
        let mut stream = ByteStream::new(MockStream::new(&["no terminator"]));
        assert!(matches!(stream.next_line(), Err(StreamError::Closed)));
    }

    #[test]
    fn test_bounded_line() {
        let mut stream = ByteStream::new(MockStream::new(&["12345\r\n"]));
        assert_eq!(stream.next_line_bounded(5).unwrap(), b"12345");

        let mut stream = ByteStream::new(MockStream::new(&["123456789\r\n"]));
        assert!(matches!(stream.next_line_bounded(5), Err(StreamError::LineTooLong(5))));
    }

    #[test]
    fn test_next_bytes_exact() {
        let mock = MockStream::new(&["he", "l", "lo world"]);
        let mut stream = ByteStream::new(mock);
        assert_eq!(stream.next_bytes(5).unwrap(), b"hello");
        assert_eq!(stream.next_byte().unwrap(), b' ');
    }

    #[test]
    fn test_next_bytes_short_input() {
        let mut stream = ByteStream::new(MockStream::new(&["abc"]));
        assert!(matches!(stream.next_bytes(10), Err(StreamError::Closed)));
    }

    #[test]
    fn test_io_error_is_propagated() {
        let mock = MockStream::new(&[]).fail_reads_with(ErrorKind::TimedOut);
        let mut stream = ByteStream::new(mock);
        match stream.next_byte() {
            Err(StreamError::Io(e)) => assert_eq!(e.kind(), ErrorKind::TimedOut),
            other => panic!("expected io error, got {:?}", other),
        }
    }
}
