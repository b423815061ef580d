//! Callwise Store - SQLite persistence
//!
//! Stores customers, call records and business cards with `sqlx`.
//! The pool is an explicit handle owned by [`CustomerStore`]; every
//! multi-statement operation runs in a scoped transaction that rolls
//! back when dropped on an error path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod seed;
pub mod store;

pub use error::{Result, StoreError};
pub use seed::{SeedOptions, SeedOutcome};
pub use store::{CustomerStore, ImportOutcome, PrioritySnapshot, RegisteredCard};
