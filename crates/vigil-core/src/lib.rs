//! # vigil-core
//!
//! Data types shared across all Vigil crates:
//! - `Identity` as supplied by the identity provider
//! - `ProfileAttributes` and the `Role` enumeration from the profile store
//! - `SessionSnapshot`, the read-only record consumers observe
//! - `SessionNotice`, the provider's session-change notification
//! - `RemoteError`, the failure type every external collaborator returns
//!
//! No I/O and no async code lives here.

pub mod errors;
pub mod identity;
pub mod profile;
pub mod session;

pub use errors::RemoteError;
pub use identity::Identity;
pub use profile::{ProfileAttributes, Role};
pub use session::{SessionEventKind, SessionNotice, SessionSnapshot, SessionView};
