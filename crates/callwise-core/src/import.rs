//! CSV customer import
//!
//! Turns an uploaded CSV file into normalised [`NewCustomer`] rows:
//! - bytes are decoded as UTF-8, falling back to Shift_JIS
//! - `customer_name` and `company_name` columns are required
//! - blank optional fields become `None`, unparsable purchase totals become 0
//! - rows repeating a `company_name` already seen in the file are dropped
//!
//! Deduplication against customers that are already stored happens in the store.

use crate::customer::{non_empty, normalize_purchase, parse_date, ContactMethod, NewCustomer};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Columns every import file must carry
pub const REQUIRED_COLUMNS: [&str; 2] = ["customer_name", "company_name"];

/// Import error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Upload is not a `.csv` file
    #[error("please upload a CSV file (got '{0}')")]
    NotCsv(String),

    /// Header row lacks required columns
    #[error("CSV is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Malformed CSV
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parsed rows ready for insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    /// Rows in file order, unique by company name
    pub rows: Vec<NewCustomer>,
    /// Rows dropped because their company already appeared in the file
    /// or a required value was blank
    pub skipped: usize,
}

/// Reject uploads whose file name does not end in `.csv`
pub fn ensure_csv_filename(file_name: &str) -> Result<(), ImportError> {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(ImportError::NotCsv(file_name.to_string()))
    }
}

/// Decode upload bytes, trying UTF-8 before Shift_JIS
pub fn decode_upload(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text;
    }
    debug!("upload is not valid UTF-8, decoding as Shift_JIS");
    let (text, _, _) = encoding_rs::SHIFT_JIS.decode(bytes);
    text
}

/// Parse an uploaded customer CSV
pub fn parse_customers_csv(bytes: &[u8]) -> Result<ImportBatch, ImportError> {
    let text = decode_upload(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !columns.contains_key(**col))
        .map(|col| (*col).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut batch = ImportBatch::default();
    let mut seen_companies = HashSet::new();

    for record in reader.records() {
        let record = record?;
        let field = |name: &str| -> Option<String> {
            columns
                .get(name)
                .and_then(|idx| record.get(*idx))
                .and_then(non_empty)
        };

        let (Some(customer_name), Some(company_name)) =
            (field("customer_name"), field("company_name"))
        else {
            batch.skipped += 1;
            continue;
        };

        if !seen_companies.insert(company_name.clone()) {
            batch.skipped += 1;
            continue;
        }

        let total_purchase =
            normalize_purchase(field("total_purchase").and_then(|v| v.parse::<f64>().ok()));
        let last_purchase_date = field("last_purchase_date").and_then(|v| parse_date(&v).ok());

        batch.rows.push(NewCustomer {
            customer_name,
            company_name,
            contact_number: field("contact_number"),
            email: field("email"),
            address: field("address"),
            last_purchase_date,
            total_purchase,
            last_contact_method: Some(ContactMethod::Csv.label().to_string()),
        });
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_basic_csv() {
        let csv = "customer_name,company_name,email,total_purchase,last_purchase_date\n\
                   Tanaka,Tokyo Trading,tanaka@tokyo.jp,150000,2024-04-01\n\
                   Sato,Osaka Systems,,,\n";
        let batch = parse_customers_csv(csv.as_bytes()).unwrap();

        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.skipped, 0);

        let first = &batch.rows[0];
        assert_eq!(first.customer_name, "Tanaka");
        assert_eq!(first.email.as_deref(), Some("tanaka@tokyo.jp"));
        assert_eq!(first.total_purchase, 150000.0);
        assert_eq!(
            first.last_purchase_date,
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(first.last_contact_method.as_deref(), Some("CSV import"));

        let second = &batch.rows[1];
        assert_eq!(second.email, None);
        assert_eq!(second.total_purchase, 0.0);
        assert_eq!(second.last_purchase_date, None);
    }

    #[test]
    fn test_duplicate_companies_keep_first() {
        let csv = "customer_name,company_name\nA,Same Corp\nB,Same Corp\nC,Other Corp\n";
        let batch = parse_customers_csv(csv.as_bytes()).unwrap();

        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.rows[0].customer_name, "A");
        assert_eq!(batch.rows[1].company_name, "Other Corp");
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "customer_name,email\nA,a@example.jp\n";
        match parse_customers_csv(csv.as_bytes()) {
            Err(ImportError::MissingColumns(cols)) => assert_eq!(cols, vec!["company_name"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_required_value_is_skipped() {
        let csv = "customer_name,company_name\n,Nameless Corp\nB,Named Corp\n";
        let batch = parse_customers_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_shift_jis_fallback() {
        let text = "customer_name,company_name\n田中,東京商事\n";
        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode(text);
        assert!(std::str::from_utf8(&encoded).is_err());

        let batch = parse_customers_csv(&encoded).unwrap();
        assert_eq!(batch.rows[0].customer_name, "田中");
        assert_eq!(batch.rows[0].company_name, "東京商事");
    }

    #[test]
    fn test_utf8_bom_header() {
        let csv = "\u{feff}customer_name,company_name\nA,Bom Corp\n";
        let batch = parse_customers_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.rows.len(), 1);
    }

    #[test]
    fn test_ensure_csv_filename() {
        assert!(ensure_csv_filename("customers.csv").is_ok());
        assert!(ensure_csv_filename("CUSTOMERS.CSV").is_ok());
        assert!(matches!(
            ensure_csv_filename("customers.xlsx"),
            Err(ImportError::NotCsv(_))
        ));
    }
}
