//! Background workers

pub mod cleanup;

pub use cleanup::{run_cleanup, CleanupQueue};
