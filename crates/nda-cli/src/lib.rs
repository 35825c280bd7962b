//! Library surface of the `bids2nda` command-line tool.

pub mod logging;
pub mod pipeline;
pub mod types;
pub mod verify;
