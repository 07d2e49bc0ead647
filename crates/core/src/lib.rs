//! `commons-core` — foundation primitives shared by the commons crates.
//!
//! No threads, no IO: identifiers and the error type used to parse them.

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::{JobId, RunId};
