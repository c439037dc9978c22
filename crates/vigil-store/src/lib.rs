//! # vigil-store
//!
//! [`vigil_sync::ProfileStore`] implementations:
//! - [`RestProfileStore`]: point lookup against a PostgREST-style endpoint
//!   (`GET {url}/rest/v1/{table}?id=eq.{id}`)
//! - [`MemoryProfileStore`]: in-process map, optionally seeded from a JSON
//!   fixture, for offline use and tests
//!
//! Every failure is reported as a [`vigil_core::RemoteError`].

mod http;
pub mod memory;
pub mod rest;

pub use memory::MemoryProfileStore;
pub use rest::RestProfileStore;
