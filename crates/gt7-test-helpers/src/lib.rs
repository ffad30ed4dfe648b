//! Test utilities shared by the agent's crates.
//!
//! - [`must_some`]: panicking unwrap with the caller's location, for test
//!   code that cannot return a `Result`.
//! - [`RecordBuilder`]: builds plaintext packets and encrypted datagrams with
//!   exactly the fields a test cares about.

pub mod fixtures;
pub mod must;

pub use fixtures::{RecordBuilder, lap_stream};
pub use must::must_some;
