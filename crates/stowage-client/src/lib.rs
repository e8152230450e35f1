//! Client library for the storage service: a [`Router`] lazily dials and
//! caches one connection per provider endpoint, and a [`Client`] binds a
//! target provider id to flatten user buffers into wire records, choose the
//! direct/bulk variant, and drive one-shot and streaming RPCs against it.

pub mod client;
pub mod error;
pub mod router;

pub use client::{Client, StreamOptions};
pub use error::Error;
pub use router::Router;
