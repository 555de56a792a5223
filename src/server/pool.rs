//! # Pool de workers
//! src/server/pool.rs
//!
//! N threads de larga vida que sacan conexiones de la cola y las atienden.
//!
//! ## Estados de un worker
//!
//! ```text
//!            ┌─────────── cola vacía: wait ──────────┐
//!            ▼                                       │
//!  ┌──────▶ Idle ──── size > 0 ───▶ Draining ──pop──▶ Handling
//!  │         │                                       │
//!  │         └── cancelado ──▶ Cancelled             │
//!  └──────────────────── conexión cerrada ◀──────────┘
//! ```
//!
//! La cancelación se mira al principio de cada vuelta por Idle: un worker
//! que está en Handling termina su conexión antes de salir.

use super::queue::ConnectionQueue;
use log::{debug, error, info};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Estado observable de un worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Esperando conexiones
    Idle = 0,
    /// Sacando una conexión de la cola
    Draining = 1,
    /// Atendiendo una conexión
    Handling = 2,
    /// Terminó por shutdown
    Cancelled = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Draining,
            2 => WorkerState::Handling,
            _ => WorkerState::Cancelled,
        }
    }
}

struct Worker {
    id: usize,
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

/// Pool fijo de workers sobre una `ConnectionQueue`
pub struct WorkerPool<T> {
    queue: Arc<ConnectionQueue<T>>,
    workers: Vec<Worker>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Lanza `size` workers que atienden cada elemento con `handler`
    ///
    /// Los threads se llaman `worker-0`, `worker-1`, ...
    pub fn spawn<F>(size: usize, queue: Arc<ConnectionQueue<T>>, handler: F) -> io::Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));
            let thread = thread::Builder::new().name(format!("worker-{}", id)).spawn({
                let queue = Arc::clone(&queue);
                let state = Arc::clone(&state);
                let handler = Arc::clone(&handler);
                move || worker_loop(id, &queue, &state, &*handler)
            });

            match thread {
                Ok(thread) => workers.push(Worker {
                    id,
                    state,
                    thread: Some(thread),
                }),
                Err(e) => {
                    // Bajar los que ya arrancaron antes de reportar
                    let mut partial = Self { queue, workers };
                    partial.shutdown();
                    return Err(e);
                }
            }
        }

        info!("Pool de {} workers iniciado", size);
        Ok(Self { queue, workers })
    }
}

impl<T> WorkerPool<T> {
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Estado actual de cada worker, en orden de id
    pub fn states(&self) -> Vec<WorkerState> {
        self.workers
            .iter()
            .map(|w| WorkerState::from_u8(w.state.load(Ordering::Acquire)))
            .collect()
    }

    /// Workers atendiendo una conexión en este momento
    pub fn busy(&self) -> usize {
        self.states()
            .into_iter()
            .filter(|s| matches!(s, WorkerState::Draining | WorkerState::Handling))
            .count()
    }

    pub fn queue(&self) -> &Arc<ConnectionQueue<T>> {
        &self.queue
    }

    /// Cierra la cola, despierta a todos y espera a que terminen
    pub fn shutdown(&mut self) {
        self.queue.close();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("worker-{} terminó con pánico", worker.id);
                }
            }
        }
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<T, F>(id: usize, queue: &ConnectionQueue<T>, state: &AtomicU8, handler: &F)
where
    F: Fn(T),
{
    let set = |s: WorkerState| state.store(s as u8, Ordering::Release);

    loop {
        set(WorkerState::Idle);
        let mut guard = queue.lock();
        let item = loop {
            if guard.is_closed() {
                drop(guard);
                set(WorkerState::Cancelled);
                debug!("worker-{} cancelado", id);
                return;
            }
            if guard.size() > 0 {
                set(WorkerState::Draining);
                if let Some(item) = guard.pop() {
                    break item;
                }
            }
            guard = queue.wait(guard);
        };
        drop(guard);

        set(WorkerState::Handling);
        if panic::catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
            error!("worker-{}: pánico atendiendo una conexión", id);
        }
    }
}
