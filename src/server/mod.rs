//! Server module for Callwise
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for the server, scoring, seeding and crew
//! - `loader`: Configuration loading from files and environment
//! - `init`: Store setup, router assembly and the run loop

pub mod config;
mod init;
mod loader;

pub use init::{open_store, run};
pub use loader::load_config;
