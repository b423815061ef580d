//! Call-priority scoring
//!
//! Ranks customers by `total_purchase / 1000 + (1 / days_since_last_contact) * 100`,
//! rounded to two decimals. Purchase volume contributes linearly; contact recency
//! contributes a hyperbolic bonus that peaks at 100 for a contact within the last day.
//!
//! Ranking is a pure function of its inputs. `today` is always passed in so the
//! result never depends on the wall clock.

use crate::customer::{normalize_purchase, Customer, CustomerId};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Days assumed for a customer that has never been called
pub const NEVER_CONTACTED_DAYS: i64 = 365;

/// Smallest `days_since_last_contact` value; same-day and future-dated calls clamp here
pub const MIN_DAYS_SINCE_CONTACT: i64 = 1;

/// Currency units per score point
pub const PURCHASE_DIVISOR: f64 = 1000.0;

/// Recency bonus at the one-day floor
pub const RECENCY_WEIGHT: f64 = 100.0;

/// Tunable constants of the scoring formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Days assumed when a customer has no call record
    #[serde(default = "default_never_contacted_days")]
    pub never_contacted_days: i64,
    /// Floor for days since the latest call
    #[serde(default = "default_min_days")]
    pub min_days: i64,
    /// Currency units per score point
    #[serde(default = "default_purchase_divisor")]
    pub purchase_divisor: f64,
    /// Recency bonus multiplier
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
}

fn default_never_contacted_days() -> i64 {
    NEVER_CONTACTED_DAYS
}

fn default_min_days() -> i64 {
    MIN_DAYS_SINCE_CONTACT
}

fn default_purchase_divisor() -> f64 {
    PURCHASE_DIVISOR
}

fn default_recency_weight() -> f64 {
    RECENCY_WEIGHT
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            never_contacted_days: NEVER_CONTACTED_DAYS,
            min_days: MIN_DAYS_SINCE_CONTACT,
            purchase_divisor: PURCHASE_DIVISOR,
            recency_weight: RECENCY_WEIGHT,
        }
    }
}

impl ScoringPolicy {
    /// Reject values that would divide by zero or flip the ordering
    pub fn validate(&self) -> Result<()> {
        if self.min_days < 1 {
            return Err(Error::InvalidPolicy(format!(
                "min_days must be at least 1 (got {})",
                self.min_days
            )));
        }
        if self.never_contacted_days < self.min_days {
            return Err(Error::InvalidPolicy(format!(
                "never_contacted_days ({}) must not be below min_days ({})",
                self.never_contacted_days, self.min_days
            )));
        }
        if !(self.purchase_divisor.is_finite() && self.purchase_divisor > 0.0) {
            return Err(Error::InvalidPolicy(
                "purchase_divisor must be a positive number".to_string(),
            ));
        }
        if !(self.recency_weight.is_finite() && self.recency_weight >= 0.0) {
            return Err(Error::InvalidPolicy(
                "recency_weight must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Whole days between the latest call and `today`, floored at `min_days`
    #[must_use]
    pub fn days_since_last_contact(&self, latest: Option<NaiveDate>, today: NaiveDate) -> i64 {
        match latest {
            Some(date) => (today - date).num_days().max(self.min_days),
            None => self.never_contacted_days,
        }
    }

    /// Score for a purchase total and a day count
    #[must_use]
    pub fn score(&self, total_purchase: f64, days_since_last_contact: i64) -> f64 {
        let purchase = normalize_purchase(Some(total_purchase));
        let days = days_since_last_contact.max(self.min_days) as f64;
        round2(purchase / self.purchase_divisor + (1.0 / days) * self.recency_weight)
    }
}

/// One row of the priority list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCustomer {
    /// Customer row id
    pub customer_id: CustomerId,
    /// Contact person
    pub customer_name: String,
    /// Company name
    pub company_name: String,
    /// Purchase total used for the score
    pub total_purchase: f64,
    /// Days since the latest call (or the never-contacted fallback)
    pub days_since_last_contact: i64,
    /// Priority score, two decimals
    pub score: f64,
}

/// Rank customers with the default policy
///
/// `latest_contact` maps a customer id to the date of its most recent call;
/// customers missing from the map have never been called.
#[must_use]
pub fn rank(
    customers: &[Customer],
    latest_contact: &HashMap<CustomerId, NaiveDate>,
    today: NaiveDate,
) -> Vec<ScoredCustomer> {
    rank_with_policy(customers, latest_contact, today, &ScoringPolicy::default())
}

/// Rank customers, highest score first
///
/// Every customer is scored; nothing is filtered or truncated. Customers with
/// equal scores keep their input order.
#[must_use]
pub fn rank_with_policy(
    customers: &[Customer],
    latest_contact: &HashMap<CustomerId, NaiveDate>,
    today: NaiveDate,
    policy: &ScoringPolicy,
) -> Vec<ScoredCustomer> {
    let mut ranked: Vec<ScoredCustomer> = customers
        .iter()
        .map(|customer| {
            let latest = latest_contact.get(&customer.customer_id).copied();
            let days = policy.days_since_last_contact(latest, today);
            let total_purchase = normalize_purchase(Some(customer.total_purchase));
            ScoredCustomer {
                customer_id: customer.customer_id,
                customer_name: customer.customer_name.clone(),
                company_name: customer.company_name.clone(),
                total_purchase,
                days_since_last_contact: days,
                score: policy.score(total_purchase, days),
            }
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Two decimals from the exact binary value, exact halves to even
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
