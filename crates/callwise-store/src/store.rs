//! Customer store using SQLite
//!
//! Tables mirror the call-recommendation schema: `customer`, `call_record`
//! (many-to-one on customer) and `ocr_card` (captured business cards).

use callwise_core::{
    BusinessCard, CallRecord, Customer, CustomerId, NewBusinessCard, NewCallRecord, NewCustomer,
};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// SQLite-based customer store
#[derive(Clone)]
pub struct CustomerStore {
    pool: Pool<Sqlite>,
}

/// Customers plus the latest call date of each, read in one transaction
#[derive(Debug, Clone, Default)]
pub struct PrioritySnapshot {
    /// Every stored customer, in id order
    pub customers: Vec<Customer>,
    /// Latest call date per customer; customers without calls are absent
    pub latest_contact: HashMap<CustomerId, NaiveDate>,
}

/// Result of a bulk import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportOutcome {
    /// Rows inserted
    pub imported: usize,
    /// Rows skipped because the company already exists
    pub skipped: usize,
}

/// Result of a business-card registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredCard {
    /// Customer the card belongs to
    pub customer_id: CustomerId,
    /// New card row id
    pub card_id: i64,
    /// Whether the customer was created for this card
    pub created_customer: bool,
}

#[derive(FromRow)]
struct CustomerRow {
    customer_id: i64,
    customer_name: String,
    contact_number: Option<String>,
    email: Option<String>,
    address: Option<String>,
    company_name: String,
    last_purchase_date: Option<NaiveDate>,
    total_purchase: Option<f64>,
    last_contact_method: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            contact_number: row.contact_number,
            email: row.email,
            address: row.address,
            company_name: row.company_name,
            last_purchase_date: row.last_purchase_date,
            total_purchase: callwise_core::normalize_purchase(row.total_purchase),
            last_contact_method: row.last_contact_method,
        }
    }
}

#[derive(FromRow)]
struct CallRecordRow {
    call_id: i64,
    customer_id: i64,
    call_date: NaiveDate,
    call_duration: Option<String>,
    call_result: Option<String>,
}

impl From<CallRecordRow> for CallRecord {
    fn from(row: CallRecordRow) -> Self {
        CallRecord {
            call_id: row.call_id,
            customer_id: row.customer_id,
            call_date: row.call_date,
            call_duration: row.call_duration,
            call_result: row.call_result,
        }
    }
}

#[derive(FromRow)]
struct CardRow {
    card_id: i64,
    customer_id: i64,
    company_name: Option<String>,
    personal_name: Option<String>,
    email: Option<String>,
    contact_number: Option<String>,
    address: Option<String>,
}

impl From<CardRow> for BusinessCard {
    fn from(row: CardRow) -> Self {
        BusinessCard {
            card_id: row.card_id,
            customer_id: row.customer_id,
            company_name: row.company_name.unwrap_or_default(),
            personal_name: row.personal_name.unwrap_or_default(),
            email: row.email,
            contact_number: row.contact_number,
            address: row.address,
        }
    }
}

/// Pool size used by [`CustomerStore::from_path`]
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const CUSTOMER_COLUMNS: &str = "customer_id, customer_name, contact_number, email, address, \
     company_name, last_purchase_date, total_purchase, last_contact_method";

impl CustomerStore {
    /// Open (creating if needed) a database file
    pub async fn from_path(path: &Path) -> Result<Self> {
        Self::open(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Open a database file with a pool size
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        Self::from_url(&url, max_connections).await
    }

    /// Open a database from a sqlx SQLite URL
    pub async fn from_url(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        debug!(url = %url, "customer store opened");
        Ok(store)
    }

    /// Private in-memory database
    ///
    /// Limited to a single pooled connection that is never recycled, since each
    /// SQLite in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customer (
                customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name VARCHAR(255) NOT NULL,
                contact_number VARCHAR(20),
                email VARCHAR(255),
                address VARCHAR(255),
                company_name VARCHAR(255) NOT NULL,
                last_purchase_date DATE,
                total_purchase REAL DEFAULT 0.0,
                last_contact_method VARCHAR(50)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS call_record (
                call_id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL,
                call_date DATE NOT NULL,
                call_duration VARCHAR(10),
                call_result VARCHAR(255),
                FOREIGN KEY (customer_id) REFERENCES customer(customer_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ocr_card (
                card_id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER,
                company_name VARCHAR(255),
                personal_name VARCHAR(255),
                email VARCHAR(255),
                contact_number VARCHAR(20),
                address VARCHAR(255),
                FOREIGN KEY (customer_id) REFERENCES customer(customer_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_customer_company ON customer(company_name)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_call_record_customer ON call_record(customer_id, call_date)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a customer and return it with its new id
    pub async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_customer(&mut conn, &customer).await?;
        Ok(customer.into_customer(id))
    }

    /// Get a customer by id
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customer WHERE customer_id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Get the first customer registered under a company name
    pub async fn find_by_company(&self, company_name: &str) -> Result<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        find_by_company(&mut conn, company_name).await
    }

    /// List all customers in id order
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customer ORDER BY customer_id",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Number of stored customers
    pub async fn count_customers(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customer")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Log a call for an existing customer
    pub async fn add_call_record(&self, record: NewCallRecord) -> Result<CallRecord> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT customer_id FROM customer WHERE customer_id = ?")
                .bind(record.customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::CustomerNotFound(record.customer_id));
        }

        let call_id = insert_call_record(&mut *tx, &record).await?;
        tx.commit().await?;

        Ok(CallRecord {
            call_id,
            customer_id: record.customer_id,
            call_date: record.call_date,
            call_duration: record.call_duration,
            call_result: Some(record.call_result),
        })
    }

    /// Call history of a customer, newest first
    pub async fn call_history(&self, customer_id: CustomerId) -> Result<Vec<CallRecord>> {
        let rows: Vec<CallRecordRow> = sqlx::query_as(
            r#"
            SELECT call_id, customer_id, call_date, call_duration, call_result
            FROM call_record
            WHERE customer_id = ?
            ORDER BY call_date DESC, call_id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CallRecord::from).collect())
    }

    /// Customers and their latest call dates from one consistent read
    pub async fn priority_snapshot(&self) -> Result<PrioritySnapshot> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customer ORDER BY customer_id",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let latest_rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT customer_id, MAX(call_date) AS latest_call_date
            FROM call_record
            GROUP BY customer_id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut latest_contact = HashMap::with_capacity(latest_rows.len());
        for (customer_id, latest) in latest_rows {
            let Some(raw) = latest else { continue };
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(date) => {
                    latest_contact.insert(customer_id, date);
                }
                Err(e) => warn!(customer_id, value = %raw, error = %e, "unparsable call_date"),
            }
        }

        Ok(PrioritySnapshot {
            customers: rows.into_iter().map(Customer::from).collect(),
            latest_contact,
        })
    }

    /// Insert customers whose company is not stored yet
    pub async fn import_customers(&self, customers: Vec<NewCustomer>) -> Result<ImportOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ImportOutcome::default();

        for customer in &customers {
            if find_by_company(&mut *tx, &customer.company_name).await?.is_some() {
                outcome.skipped += 1;
                continue;
            }
            insert_customer(&mut *tx, customer).await?;
            outcome.imported += 1;
        }

        tx.commit().await?;
        info!(
            imported = outcome.imported,
            skipped = outcome.skipped,
            "customer import committed"
        );
        Ok(outcome)
    }

    /// Attach a business card to the customer of its company, creating one if needed
    pub async fn register_card(&self, card: NewBusinessCard) -> Result<RegisteredCard> {
        let mut tx = self.pool.begin().await?;

        let (customer_id, created_customer) =
            match find_by_company(&mut *tx, &card.company_name).await? {
                Some(existing) => (existing.customer_id, false),
                None => (insert_customer(&mut *tx, &card.to_new_customer()).await?, true),
            };

        let card_id = sqlx::query(
            r#"
            INSERT INTO ocr_card (
                customer_id, company_name, personal_name, email, contact_number, address
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer_id)
        .bind(&card.company_name)
        .bind(&card.personal_name)
        .bind(&card.email)
        .bind(&card.contact_number)
        .bind(&card.address)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        Ok(RegisteredCard {
            customer_id,
            card_id,
            created_customer,
        })
    }

    /// Cards captured for a customer
    pub async fn cards_for(&self, customer_id: CustomerId) -> Result<Vec<BusinessCard>> {
        let rows: Vec<CardRow> = sqlx::query_as(
            r#"
            SELECT card_id, customer_id, company_name, personal_name, email, contact_number, address
            FROM ocr_card
            WHERE customer_id = ?
            ORDER BY card_id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BusinessCard::from).collect())
    }
}

pub(crate) async fn insert_customer(
    conn: &mut SqliteConnection,
    customer: &NewCustomer,
) -> Result<CustomerId> {
    let id = sqlx::query(
        r#"
        INSERT INTO customer (
            customer_name, contact_number, email, address, company_name,
            last_purchase_date, total_purchase, last_contact_method
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.customer_name)
    .bind(&customer.contact_number)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(&customer.company_name)
    .bind(customer.last_purchase_date)
    .bind(callwise_core::normalize_purchase(Some(customer.total_purchase)))
    .bind(&customer.last_contact_method)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub(crate) async fn insert_call_record(
    conn: &mut SqliteConnection,
    record: &NewCallRecord,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO call_record (customer_id, call_date, call_duration, call_result)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(record.customer_id)
    .bind(record.call_date)
    .bind(&record.call_duration)
    .bind(&record.call_result)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

async fn find_by_company(
    conn: &mut SqliteConnection,
    company_name: &str,
) -> Result<Option<Customer>> {
    let row: Option<CustomerRow> = sqlx::query_as(&format!(
        "SELECT {} FROM customer WHERE company_name = ? ORDER BY customer_id LIMIT 1",
        CUSTOMER_COLUMNS
    ))
    .bind(company_name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Customer::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use callwise_core::ContactMethod;
    use tempfile::TempDir;

    struct TestContext {
        store: CustomerStore,
        _dir: TempDir,
    }

    async fn create_test_context() -> TestContext {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_callwise.db");
        let store = CustomerStore::from_path(&path).await.unwrap();
        TestContext { store, _dir: dir }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_customer() {
        let ctx = create_test_context().await;
        let store = &ctx.store;

        let created = store
            .create_customer(
                NewCustomer::new("Tanaka", "Tokyo Trading")
                    .with_contact("03-1111-2222", "", "Chiyoda")
                    .with_purchase(250_000.0, Some(date(2024, 12, 1)))
                    .with_method(ContactMethod::Manual),
            )
            .await
            .unwrap();

        let fetched = store.get_customer(created.customer_id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.email, None);
        assert_eq!(fetched.last_purchase_date, Some(date(2024, 12, 1)));

        assert!(store.get_customer(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_call_record_requires_customer() {
        let ctx = create_test_context().await;
        let result = ctx
            .store
            .add_call_record(NewCallRecord {
                customer_id: 42,
                call_date: date(2025, 1, 1),
                call_result: "No answer".to_string(),
                call_duration: None,
            })
            .await;

        assert!(matches!(result, Err(StoreError::CustomerNotFound(42))));
    }

    #[tokio::test]
    async fn test_call_history_newest_first() {
        let ctx = create_test_context().await;
        let store = &ctx.store;
        let customer = store
            .create_customer(NewCustomer::new("Sato", "Osaka Systems"))
            .await
            .unwrap();

        for (day, result) in [(3, "Callback"), (20, "Deal closed"), (10, "Sent brochure")] {
            store
                .add_call_record(NewCallRecord {
                    customer_id: customer.customer_id,
                    call_date: date(2025, 2, day),
                    call_result: result.to_string(),
                    call_duration: Some("05:00".to_string()),
                })
                .await
                .unwrap();
        }

        let history = store.call_history(customer.customer_id).await.unwrap();
        let results: Vec<_> = history
            .iter()
            .map(|r| r.call_result.clone().unwrap())
            .collect();
        assert_eq!(results, vec!["Deal closed", "Sent brochure", "Callback"]);
    }

    #[tokio::test]
    async fn test_priority_snapshot_latest_dates() {
        let ctx = create_test_context().await;
        let store = &ctx.store;

        let called = store
            .create_customer(NewCustomer::new("A", "Alpha"))
            .await
            .unwrap();
        let silent = store
            .create_customer(NewCustomer::new("B", "Beta"))
            .await
            .unwrap();

        for day in [1, 15, 7] {
            store
                .add_call_record(NewCallRecord {
                    customer_id: called.customer_id,
                    call_date: date(2025, 3, day),
                    call_result: "Considering".to_string(),
                    call_duration: None,
                })
                .await
                .unwrap();
        }

        let snapshot = store.priority_snapshot().await.unwrap();
        assert_eq!(snapshot.customers.len(), 2);
        assert_eq!(
            snapshot.latest_contact.get(&called.customer_id),
            Some(&date(2025, 3, 15))
        );
        assert!(!snapshot.latest_contact.contains_key(&silent.customer_id));
    }

    #[tokio::test]
    async fn test_import_skips_existing_companies() {
        let ctx = create_test_context().await;
        let store = &ctx.store;
        store
            .create_customer(NewCustomer::new("Existing", "Kept Corp"))
            .await
            .unwrap();

        let outcome = store
            .import_customers(vec![
                NewCustomer::new("New", "Fresh Corp").with_method(ContactMethod::Csv),
                NewCustomer::new("Dup", "Kept Corp").with_method(ContactMethod::Csv),
            ])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ImportOutcome {
                imported: 1,
                skipped: 1
            }
        );
        assert_eq!(store.count_customers().await.unwrap(), 2);
        let kept = store.find_by_company("Kept Corp").await.unwrap().unwrap();
        assert_eq!(kept.customer_name, "Existing");
    }

    #[tokio::test]
    async fn test_register_card_reuses_company() {
        let ctx = create_test_context().await;
        let store = &ctx.store;

        let card = NewBusinessCard {
            company_name: "Nagoya Industries".to_string(),
            personal_name: "Ito".to_string(),
            email: Some("ito@nagoya.jp".to_string()),
            ..Default::default()
        };

        let first = store.register_card(card.clone()).await.unwrap();
        assert!(first.created_customer);

        let second = store.register_card(card).await.unwrap();
        assert!(!second.created_customer);
        assert_eq!(second.customer_id, first.customer_id);

        let customer = store.get_customer(first.customer_id).await.unwrap().unwrap();
        assert_eq!(customer.last_contact_method.as_deref(), Some("Business card"));
        assert_eq!(customer.total_purchase, 0.0);

        let cards = store.cards_for(first.customer_id).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].personal_name, "Ito");
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = CustomerStore::in_memory().await.unwrap();
        store
            .create_customer(NewCustomer::new("Mem", "Memory Corp"))
            .await
            .unwrap();
        assert_eq!(store.count_customers().await.unwrap(), 1);
    }
}
