//! TCP server: listener, application context and the session registry.
//!
//! The accept loop hands each connection to its own session thread; all
//! shared state lives in an explicit [`ServerContext`] (no globals). The
//! registry keys live sessions by a monotonically assigned connection id
//! and keeps a socket handle per session so a stop request can shut down
//! blocked readers.

pub mod player;
pub mod session;

use crate::storage::Store;
use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Default port the server listens on.
pub const DEFAULT_PORT: u16 = 8881;

/// Shared state passed to the accept loop and every session.
pub struct ServerContext {
    store: Mutex<Store>,
    registry: Registry,
    running: AtomicBool,
}

impl ServerContext {
    pub fn new(store: Store) -> Arc<ServerContext> {
        Arc::new(ServerContext {
            store: Mutex::new(store),
            registry: Registry::default(),
            running: AtomicBool::new(true),
        })
    }

    /// Exclusive access to the persistence layer. Held only for single
    /// round trips inside a dispatch step.
    pub fn store(&self) -> MutexGuard<'_, Store> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cancellation signal: stops the accept loop and shuts down every
    /// live session socket so blocked reads fail over to teardown.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.registry.shutdown_all();
    }
}

/// Live sessions, keyed by connection id.
#[derive(Default)]
pub struct Registry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, TcpStream>>,
}

impl Registry {
    /// Register a new connection and hand out its id.
    pub fn join(&self, stream: &TcpStream) -> io::Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = stream.try_clone()?;
        self.lock().insert(id, handle);
        Ok(id)
    }

    /// Drop a finished session.
    pub fn leave(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn shutdown_all(&self) {
        for stream in self.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The listening server.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    ctx: Arc<ServerContext>,
}

impl Server {
    /// Bind the listener and build the shared context around the store.
    pub fn bind(addr: &str, store: Store) -> io::Result<Server> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        Ok(Server {
            listener,
            addr,
            ctx: ServerContext::new(store),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Accept connections until the context is stopped. Each connection
    /// gets a registry id and its own session thread.
    pub fn run(&self) -> io::Result<()> {
        tracing::info!(addr = %self.addr, "listening");
        loop {
            if !self.ctx.is_running() {
                break;
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    match self.ctx.registry().join(&stream) {
                        Ok(id) => {
                            tracing::info!(id, %peer, "session connected");
                            let ctx = Arc::clone(&self.ctx);
                            thread::spawn(move || session::run(stream, id, ctx));
                        }
                        Err(e) => {
                            tracing::warn!(%peer, error = %e, "could not register session");
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!("server stopped");
        Ok(())
    }
}
