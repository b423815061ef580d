//! Talk-script hints
//!
//! Fixed hint texts shown on the customer page before a call.

use crate::customer::CustomerId;

const DEFAULT_HINT: &str = "Tailor the proposal to the customer's needs. \
Review the notes from the previous conversation before calling.";

/// Hint text for a customer
#[must_use]
pub fn script_hint(customer_id: CustomerId) -> &'static str {
    match customer_id {
        1 => {
            "Three months have passed since the last purchase. Introduce the new product line \
             and follow up on the maintenance service they showed interest in last time."
        }
        2 => {
            "Time to follow up on the documents that were sent. Ask for their impressions \
             and move on to a concrete rollout schedule."
        }
        _ => DEFAULT_HINT,
    }
}
