//! Demo data seeding
//!
//! Fills an empty database with deterministic customers and call history
//! so the priority list has something to rank.

use callwise_core::{NewCallRecord, NewCustomer};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::store::{insert_call_record, insert_customer, CustomerStore};

const SURNAMES: &[&str] = &[
    "Tanaka", "Sato", "Suzuki", "Takahashi", "Ito", "Watanabe", "Yamamoto", "Nakamura",
    "Kobayashi", "Kato", "Yoshida", "Yamada", "Sasaki", "Yamaguchi", "Matsumoto", "Inoue",
    "Kimura", "Hayashi", "Saito", "Shimizu",
];

const GIVEN_NAMES: &[&str] = &[
    "Taro", "Jiro", "Ichiro", "Kenichi", "Makoto", "Hiroshi", "Takashi", "Daisuke", "Sho",
    "Yuichi", "Hanako", "Keiko", "Yumiko", "Sachiko", "Yuko", "Akemi", "Kumiko", "Mayumi",
    "Naoko", "Rina",
];

const COMPANY_PREFIXES: &[&str] = &[
    "Tokyo", "Osaka", "Nagoya", "Yokohama", "Fukuoka", "Sapporo", "Sendai", "Hiroshima", "Kyoto",
    "Kobe", "Kawasaki", "Saitama", "Chiba", "Hokkaido", "Kyushu", "Kanto", "Kansai", "Chubu",
    "Tokai", "Kinki",
];

const COMPANY_TYPES: &[&str] = &[
    "Trading", "Industries", "Manufacturing", "Bussan", "Systems", "Technology", "Consulting",
    "Solutions", "Holdings", "Services", "Works", "Construction", "Foods", "Chemical", "Electric",
];

const ADDRESSES: &[&str] = &[
    "1-1-1 Marunouchi, Chiyoda-ku, Tokyo",
    "2-3-4 Umeda, Kita-ku, Osaka",
    "3-5-6 Meieki, Nakamura-ku, Nagoya",
    "1-2-3 Takashima, Nishi-ku, Yokohama",
    "4-5-6 Hakataekimae, Hakata-ku, Fukuoka",
    "2-7-8 Odorinishi, Chuo-ku, Sapporo",
    "3-9-10 Ichibancho, Aoba-ku, Sendai",
    "11-12-13 Motomachi, Naka-ku, Hiroshima",
    "Shijo-dori Karasuma Higashi-iru, Shimogyo-ku, Kyoto",
    "1-14-15 Sannomiyacho, Chuo-ku, Kobe",
    "1-2-3 Sakuragicho, Omiya-ku, Saitama",
    "1-3-5 Chuoko, Chuo-ku, Chiba",
    "9-6-1 Otemachi, Aoi-ku, Shizuoka",
    "1-1-38 Sannomaru, Mito",
    "481 Motoyoshicho, Nagano",
];

const CONTACT_METHODS: &[&str] = &["Phone", "Email", "Visit", "Online"];

const CALL_RESULTS: &[&str] = &[
    "Callback requested",
    "Deal closed",
    "Brochure sent",
    "No answer",
    "Not interested",
    "Considering",
    "Contracted",
    "Call again",
    "Contact person absent",
    "Quote requested",
];

const AREA_CODES: &[&str] = &["03", "06", "052", "045", "092", "011", "022", "082", "075", "078"];

/// Seeding parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedOptions {
    /// Number of customers to create
    pub customers: usize,
    /// Reference date; call dates are drawn relative to it
    #[serde(skip)]
    pub today: NaiveDate,
    /// RNG seed
    pub rng_seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            customers: 100,
            today: chrono::Local::now().date_naive(),
            rng_seed: 42,
        }
    }
}

/// What a seeding run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The database already had customers
    Skipped {
        /// Existing customer count
        existing: i64,
    },
    /// Demo data was inserted
    Seeded {
        /// Customers inserted
        customers: usize,
        /// Call records inserted
        call_records: usize,
    },
}

fn days_before(rng: &mut StdRng, today: NaiveDate, min_days: i64, max_days: i64) -> NaiveDate {
    today - Duration::days(rng.gen_range(min_days..=max_days))
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn random_phone(rng: &mut StdRng) -> String {
    let area = pick(rng, AREA_CODES);
    format!(
        "{}-{}-{}",
        area,
        rng.gen_range(1000..=9999),
        rng.gen_range(1000..=9999)
    )
}

impl CustomerStore {
    /// Insert demo customers unless the customer table already has rows
    pub async fn seed_demo(&self, options: &SeedOptions) -> Result<SeedOutcome> {
        let existing = self.count_customers().await?;
        if existing > 0 {
            info!(existing, "customers already present, skipping seed");
            return Ok(SeedOutcome::Skipped { existing });
        }

        let mut rng = StdRng::seed_from_u64(options.rng_seed);
        let mut tx = self.pool().begin().await?;
        let mut call_records = 0;

        for i in 0..options.customers {
            let surname = pick(&mut rng, SURNAMES);
            let given_name = pick(&mut rng, GIVEN_NAMES);
            let prefix = COMPANY_PREFIXES[i % COMPANY_PREFIXES.len()];
            let company_type = COMPANY_TYPES[i % COMPANY_TYPES.len()];
            // numbered so company names stay unique
            let company_name = format!("{} {} {:03}", prefix, company_type, i + 1);

            let phone = random_phone(&mut rng);
            let email = format!(
                "user{}@{}.co.jp",
                i + 1,
                company_name.replace(' ', "").to_lowercase()
            );
            let address = pick(&mut rng, ADDRESSES);
            let last_purchase = days_before(&mut rng, options.today, 30, 730);
            let total = (rng.gen_range(500_000.0..50_000_000.0_f64) / 1000.0).round() * 1000.0;
            let method = pick(&mut rng, CONTACT_METHODS);

            let customer = NewCustomer::new(format!("{} {}", surname, given_name), company_name)
                .with_contact(phone, email, address)
                .with_purchase(total, Some(last_purchase))
                .with_method_label(method);
            let customer_id = insert_customer(&mut *tx, &customer).await?;

            let num_calls = rng.gen_range(1..=5);
            let mut call_dates: Vec<NaiveDate> = (0..num_calls)
                .map(|_| days_before(&mut rng, options.today, 1, 365))
                .collect();
            call_dates.sort_unstable_by(|a, b| b.cmp(a));

            for call_date in call_dates {
                let minutes = rng.gen_range(1..=30);
                let seconds = rng.gen_range(0..=59);
                let record = NewCallRecord {
                    customer_id,
                    call_date,
                    call_result: pick(&mut rng, CALL_RESULTS).to_string(),
                    call_duration: Some(format!("{:02}:{:02}", minutes, seconds)),
                };
                insert_call_record(&mut *tx, &record).await?;
                call_records += 1;
            }
        }

        tx.commit().await?;
        info!(
            customers = options.customers,
            call_records, "demo data seeded"
        );

        Ok(SeedOutcome::Seeded {
            customers: options.customers,
            call_records,
        })
    }
}
