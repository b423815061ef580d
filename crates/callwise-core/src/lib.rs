//! Callwise Core - Call Recommendation Domain
//!
//! This crate provides the storage-independent parts of Callwise:
//! - Customer: customers, call records and business cards
//! - Scoring: the call-priority scorer (purchase volume + contact recency)
//! - Import: CSV upload decoding and row normalisation
//! - Hint: talk-script hints shown next to a customer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod customer;
pub mod error;
pub mod hint;
pub mod import;
pub mod scoring;

pub use customer::{
    non_empty, normalize_purchase, parse_date, BusinessCard, CallRecord, ContactMethod, Customer,
    CustomerId, NewBusinessCard, NewCallRecord, NewCustomer,
};
pub use error::{Error, Result};
pub use hint::script_hint;
pub use import::{parse_customers_csv, ImportBatch, ImportError};
pub use scoring::{rank, rank_with_policy, ScoredCustomer, ScoringPolicy};
