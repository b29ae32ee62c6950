//! Utility functions for working with A2A types.
//!
//! Text extraction and summarisation helpers shared by the client and the
//! session recorder, plus protocol constants.

pub mod constants;
pub mod message;
pub mod parts;

pub use constants::*;
pub use message::*;
pub use parts::*;
