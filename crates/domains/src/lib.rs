//! # domains
//!
//! Entities, error taxonomy and port traits for talkboard.
//! Nothing in here performs I/O; adapters implement the ports.

pub mod error;
pub mod models;
pub mod ports;
pub mod views;

pub use error::*;
pub use models::*;
pub use ports::*;
pub use views::*;
