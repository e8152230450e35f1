//! Lazily-dialed connection cache, one entry per provider endpoint.
//!
//! Unlike `gazette::Router` (which hands out a cheap, clonable gRPC
//! `Channel` and releases its lock the moment dialing finishes), a stowage
//! connection carries no per-request correlation id: requests and their
//! replies are matched purely by arrival order on one TCP stream. So the
//! lock here is held by the caller for an entire request/response (or
//! request/backs/response) exchange rather than just across the dial —
//! `acquire` hands back an owned guard instead of a cheap clone.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use stowage_wire::{Frame, TransportError};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::Error;

struct Slot {
    conn: Option<Framed<TcpStream, LengthDelimitedCodec>>,
    uses: usize,
}

/// Connection cache keyed by provider endpoint address.
#[derive(Clone)]
pub struct Router {
    inner: Arc<std::sync::Mutex<HashMap<SocketAddr, Arc<futures::lock::Mutex<Slot>>>>>,
}

impl Router {
    pub fn new() -> Router {
        Router {
            inner: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    fn slot_for(&self, addr: SocketAddr) -> Arc<futures::lock::Mutex<Slot>> {
        let mut slots = self.inner.lock().unwrap();
        slots
            .entry(addr)
            .or_insert_with(|| {
                Arc::new(futures::lock::Mutex::new(Slot {
                    conn: None,
                    uses: 0,
                }))
            })
            .clone()
    }

    /// Dials `addr` if there is no ready connection, then holds the slot's
    /// lock for the caller until the returned guard is dropped.
    pub async fn acquire(&self, addr: SocketAddr) -> Result<ConnectionGuard, Error> {
        let slot = self.slot_for(addr);
        let mut guard = slot.lock_owned().await;

        if guard.conn.is_none() {
            tracing::debug!(%addr, "dialing provider endpoint");
            let stream = TcpStream::connect(addr).await?;
            guard.conn = Some(stowage_wire::framed(stream));
        }
        guard.uses += 1;

        Ok(ConnectionGuard { guard })
    }

    /// Drops connections that have gone idle since the previous sweep.
    /// Entries currently checked out by an in-flight request are left alone.
    pub fn sweep(&self) {
        let mut slots = self.inner.lock().unwrap();
        slots.retain(|addr, slot| {
            let Some(mut state) = slot.try_lock() else {
                return true;
            };
            if state.conn.is_none() {
                return false;
            }
            if state.uses == 0 {
                tracing::debug!(%addr, "dropping idle provider connection");
                return false;
            }
            state.uses = 0;
            true
        });
    }
}

impl Default for Router {
    fn default() -> Router {
        Router::new()
    }
}

/// Exclusive access to one provider connection, held for the duration of a
/// single request/response exchange.
pub struct ConnectionGuard {
    guard: futures::lock::OwnedMutexGuard<Slot>,
}

impl ConnectionGuard {
    pub async fn send(&mut self, frame: Frame) -> Result<(), Error> {
        let conn = self.guard.conn.as_mut().expect("connected by acquire");
        conn.send(frame.encode()).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Frame, Error> {
        let conn = self.guard.conn.as_mut().expect("connected by acquire");
        let segment = conn
            .next()
            .await
            .ok_or(TransportError::Closed)??;
        Ok(stowage_wire::decode_segment(segment.freeze())?)
    }

    /// Drops the cached connection; the next `acquire` for this address redials.
    pub fn poison(&mut self) {
        self.guard.conn = None;
    }
}
