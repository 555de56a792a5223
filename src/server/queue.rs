//! # Cola de conexiones acotada
//! src/server/queue.rs
//!
//! Ring buffer de capacidad fija compartido entre el acceptor (productor) y
//! los workers (consumidores). Un mutex protege todo el estado y dos
//! condition variables avisan "hay elementos" y "hay espacio".
//!
//! ```text
//!          back                front
//!           ▼                    ▼
//!  [ _ | _ | c1 | c2 | c3 | c4 | _ | _ ]
//!            pop ◀──────────── push
//! ```
//!
//! - `size = (front - back) mod capacity`
//! - Con `capacity` slots entran `capacity - 1` elementos: un slot queda
//!   siempre libre para distinguir lleno de vacío
//! - Orden FIFO
//! - Cada push despierta a un consumidor; `close` despierta a todos

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Capacidad por defecto (8191 conexiones en espera)
pub const QUEUE_CAPACITY: usize = 8192;

/// Errores al encolar. El elemento se devuelve para que el que llama decida
#[derive(Debug, thiserror::Error)]
pub enum QueueError<T> {
    #[error("queue is full (capacity {capacity})")]
    Full { item: T, capacity: usize },

    #[error("queue is closed")]
    Closed(T),
}

impl<T> QueueError<T> {
    /// Recupera el elemento rechazado
    pub fn into_inner(self) -> T {
        match self {
            QueueError::Full { item, .. } => item,
            QueueError::Closed(item) => item,
        }
    }
}

struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    back: usize,
    front: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            back: 0,
            front: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn size(&self) -> usize {
        (self.front + self.capacity() - self.back) % self.capacity()
    }

    fn push(&mut self, item: T) -> Result<(), T> {
        let next = (self.front + 1) % self.capacity();
        if next == self.back {
            return Err(item);
        }
        self.slots[self.front] = Some(item);
        self.front = next;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.back == self.front {
            return None;
        }
        let item = self.slots[self.back].take();
        self.back = (self.back + 1) % self.capacity();
        item
    }
}

struct State<T> {
    ring: RingBuffer<T>,
    closed: bool,
}

pub struct ConnectionQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// Cola bloqueada por el que la tiene
///
/// Los workers sacan elementos solo a través del guard, así el chequeo de
/// tamaño y el pop ocurren bajo el mismo lock.
pub struct QueueGuard<'a, T> {
    guard: MutexGuard<'a, State<T>>,
    queue: &'a ConnectionQueue<T>,
}

impl<T> ConnectionQueue<T> {
    /// Crea una cola con `capacity` slots
    ///
    /// # Panics
    ///
    /// Si `capacity < 2` (no cabría ningún elemento)
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "queue capacity must be at least 2");
        Self {
            state: Mutex::new(State {
                ring: RingBuffer::new(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        // Un worker que entró en pánico no deja el ring inconsistente:
        // push y pop no pueden fallar a medias
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola sin bloquear
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::server::queue::{ConnectionQueue, QueueError};
    ///
    /// let queue = ConnectionQueue::new(3);
    /// queue.push(1).unwrap();
    /// queue.push(2).unwrap();
    /// assert!(matches!(queue.push(3), Err(QueueError::Full { item: 3, .. })));
    /// assert_eq!(queue.size(), 2);
    /// ```
    pub fn push(&self, item: T) -> Result<(), QueueError<T>> {
        let mut state = self.lock_state();
        if state.closed {
            return Err(QueueError::Closed(item));
        }
        let capacity = state.ring.capacity();
        state
            .ring
            .push(item)
            .map_err(|item| QueueError::Full { item, capacity })?;
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Encola esperando a que haya espacio
    ///
    /// Solo falla si la cola se cierra mientras espera.
    pub fn push_blocking(&self, item: T) -> Result<(), QueueError<T>> {
        let mut state = self.lock_state();
        loop {
            if state.closed {
                return Err(QueueError::Closed(item));
            }
            if state.ring.size() < state.ring.capacity() - 1 {
                break;
            }
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if let Err(item) = state.ring.push(item) {
            // Hay espacio garantizado bajo el lock
            return Err(QueueError::Full {
                item,
                capacity: state.ring.capacity(),
            });
        }
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Toma el lock de la cola
    pub fn lock(&self) -> QueueGuard<'_, T> {
        QueueGuard {
            guard: self.lock_state(),
            queue: self,
        }
    }

    /// Libera el lock y duerme hasta que alguien encole o cierre
    ///
    /// Puede despertar sin motivo: el que llama vuelve a chequear.
    pub fn wait<'a>(&'a self, guard: QueueGuard<'a, T>) -> QueueGuard<'a, T> {
        let guard = self
            .not_empty
            .wait(guard.guard)
            .unwrap_or_else(PoisonError::into_inner);
        QueueGuard { guard, queue: self }
    }

    /// Elementos en espera
    pub fn size(&self) -> usize {
        self.lock_state().ring.size()
    }

    /// Cantidad de slots (entran `capacity - 1` elementos)
    pub fn capacity(&self) -> usize {
        self.lock_state().ring.capacity()
    }

    /// Marca la cola como cerrada y despierta a todos los que esperan
    pub fn close(&self) {
        self.lock_state().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }
}

impl<T> Default for ConnectionQueue<T> {
    fn default() -> Self {
        Self::new(QUEUE_CAPACITY)
    }
}

impl<'a, T> QueueGuard<'a, T> {
    /// Saca el elemento más antiguo, si hay
    pub fn pop(&mut self) -> Option<T> {
        let item = self.guard.ring.pop();
        if item.is_some() {
            self.queue.not_full.notify_one();
        }
        item
    }

    pub fn size(&self) -> usize {
        self.guard.ring.size()
    }

    pub fn is_closed(&self) -> bool {
        self.guard.closed
    }
}
