//! Domain Layer
//!
//! Entities, value objects, ports and pure services. Nothing in here
//! touches the filesystem or spawns processes.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
