//! sace-queue - offline operation queue for SACE field-visit registers
//!
//! Register mutations made while a field agent has no connectivity are
//! persisted and replayed in order once the device is back online, with a
//! bounded number of attempts per operation.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod logging;
pub mod output;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::QueueError;
pub use sync::{Mutation, QueueController, RegisterApi, RegisterPayload};
