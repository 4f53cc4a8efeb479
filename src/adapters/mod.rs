//! Adapters Layer
//!
//! Inbound adapters drive the application (the CLI); outbound adapters
//! implement the domain ports against nginx and the shell.

pub mod inbound;
pub mod outbound;
