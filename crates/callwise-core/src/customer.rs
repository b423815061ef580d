//! Customer records
//!
//! Customers, their call history and captured business cards. Records are
//! append-only: nothing here mutates or deletes an existing row.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Customer identifier (database row id)
pub type CustomerId = i64;

/// How a customer entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    /// Typed in through the manual entry form
    Manual,
    /// Bulk CSV upload
    Csv,
    /// Business card capture
    BusinessCard,
}

impl ContactMethod {
    /// Label stored in `last_contact_method`
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manual => "Manual entry",
            Self::Csv => "CSV import",
            Self::BusinessCard => "Business card",
        }
    }
}

/// A stored customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Row id
    pub customer_id: CustomerId,
    /// Contact person
    pub customer_name: String,
    /// Phone number
    pub contact_number: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Company name (dedup key for bulk imports)
    pub company_name: String,
    /// Date of the latest purchase
    pub last_purchase_date: Option<NaiveDate>,
    /// Accumulated purchase amount, never negative
    pub total_purchase: f64,
    /// Acquisition / contact channel label
    pub last_contact_method: Option<String>,
}

/// A customer that has not been stored yet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Contact person
    pub customer_name: String,
    /// Company name
    pub company_name: String,
    /// Phone number
    pub contact_number: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Date of the latest purchase
    pub last_purchase_date: Option<NaiveDate>,
    /// Accumulated purchase amount
    pub total_purchase: f64,
    /// Acquisition / contact channel label
    pub last_contact_method: Option<String>,
}

impl NewCustomer {
    /// Create a customer with the two mandatory fields
    #[must_use]
    pub fn new(customer_name: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            customer_name: customer_name.into(),
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    /// Set phone, email and address, turning blank strings into `None`
    #[must_use]
    pub fn with_contact(
        mut self,
        contact_number: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.contact_number = non_empty(contact_number);
        self.email = non_empty(email);
        self.address = non_empty(address);
        self
    }

    /// Set the purchase total
    #[must_use]
    pub fn with_purchase(mut self, total: f64, last_purchase_date: Option<NaiveDate>) -> Self {
        self.total_purchase = normalize_purchase(Some(total));
        self.last_purchase_date = last_purchase_date;
        self
    }

    /// Set the contact method from a known channel
    #[must_use]
    pub fn with_method(mut self, method: ContactMethod) -> Self {
        self.last_contact_method = Some(method.label().to_string());
        self
    }

    /// Set a free-text contact method label
    #[must_use]
    pub fn with_method_label(mut self, label: impl Into<String>) -> Self {
        self.last_contact_method = non_empty(label);
        self
    }

    /// Attach the row id assigned by storage
    #[must_use]
    pub fn into_customer(self, customer_id: CustomerId) -> Customer {
        Customer {
            customer_id,
            customer_name: self.customer_name,
            contact_number: self.contact_number,
            email: self.email,
            address: self.address,
            company_name: self.company_name,
            last_purchase_date: self.last_purchase_date,
            total_purchase: normalize_purchase(Some(self.total_purchase)),
            last_contact_method: self.last_contact_method,
        }
    }
}

/// A logged call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Row id
    pub call_id: i64,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Day of the call
    pub call_date: NaiveDate,
    /// Duration as entered, e.g. `"05:30"`
    pub call_duration: Option<String>,
    /// Outcome label
    pub call_result: Option<String>,
}

/// A call that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCallRecord {
    /// Owning customer, must exist
    pub customer_id: CustomerId,
    /// Day of the call
    pub call_date: NaiveDate,
    /// Outcome label
    pub call_result: String,
    /// Duration as entered
    pub call_duration: Option<String>,
}

/// A captured business card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCard {
    /// Row id
    pub card_id: i64,
    /// Customer the card was attached to
    pub customer_id: CustomerId,
    /// Company printed on the card
    pub company_name: String,
    /// Person printed on the card
    pub personal_name: String,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub contact_number: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

/// Business card fields as extracted from the card
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewBusinessCard {
    /// Company printed on the card
    pub company_name: String,
    /// Person printed on the card
    pub personal_name: String,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub contact_number: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

impl NewBusinessCard {
    /// Customer created when no customer with the card's company exists
    #[must_use]
    pub fn to_new_customer(&self) -> NewCustomer {
        NewCustomer {
            customer_name: self.personal_name.clone(),
            company_name: self.company_name.clone(),
            contact_number: self.contact_number.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            last_purchase_date: None,
            total_purchase: 0.0,
            last_contact_method: Some(ContactMethod::BusinessCard.label().to_string()),
        }
    }
}

/// Trimmed string, or `None` when blank
pub fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Missing, negative or non-finite purchase totals count as 0
#[must_use]
pub fn normalize_purchase(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(value.to_string()))
}
