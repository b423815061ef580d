//! Data CLI commands
//!
//! `callwise seed` - insert demo customers into an empty database
//! `callwise rank` - print the priority list

use crate::server::{config::AppConfig, open_store};
use anyhow::{Context, Result};
use callwise_core::{rank_with_policy, ScoredCustomer};
use callwise_store::SeedOutcome;
use chrono::NaiveDate;

/// Seed demo data
pub async fn seed(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let outcome = store
        .seed_demo(&config.seed)
        .await
        .context("Failed to seed demo data")?;
    store.close().await;

    match outcome {
        SeedOutcome::Seeded {
            customers,
            call_records,
        } => println!(
            "Seeded {} customers and {} call records into {}",
            customers,
            call_records,
            config.database.path.display()
        ),
        SeedOutcome::Skipped { existing } => println!(
            "Database already holds {} customers, nothing seeded",
            existing
        ),
    }
    Ok(())
}

/// Print the priority list scored against `today` (local date when unset)
pub async fn rank(config: &AppConfig, today: Option<NaiveDate>) -> Result<()> {
    let store = open_store(config).await?;
    let snapshot = store
        .priority_snapshot()
        .await
        .context("Failed to read customers")?;
    store.close().await;

    let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let ranked = rank_with_policy(
        &snapshot.customers,
        &snapshot.latest_contact,
        today,
        &config.scoring,
    );

    println!("\nCall priority ({})", today);
    print!("{}", render_table(&ranked));
    Ok(())
}

fn render_table(ranked: &[ScoredCustomer]) -> String {
    if ranked.is_empty() {
        return "No customers.\n".to_string();
    }

    let mut out = format!(
        "{:>4}  {:>6}  {:<28}  {:<20}  {:>14}  {:>6}  {:>10}\n",
        "#", "id", "company", "contact", "purchases", "days", "score"
    );
    for (i, row) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:>6}  {:<28}  {:<20}  {:>14.0}  {:>6}  {:>10.2}\n",
            i + 1,
            row.customer_id,
            truncate(&row.company_name, 28),
            truncate(&row.customer_name, 20),
            row.total_purchase,
            row.days_since_last_contact,
            row.score
        ));
    }
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: i64, company: &str, score: f64) -> ScoredCustomer {
        ScoredCustomer {
            customer_id: id,
            customer_name: "Suzuki".to_string(),
            company_name: company.to_string(),
            total_purchase: 1000.0,
            days_since_last_contact: 3,
            score,
        }
    }

    #[test]
    fn test_render_table() {
        assert_eq!(render_table(&[]), "No customers.\n");

        let table = render_table(&[scored(1, "Suzuki Motors", 43.33), scored(2, "Kimura", 1.0)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Suzuki Motors"));
        assert!(lines[1].trim_end().ends_with("43.33"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long company name", 8), "a very …");
    }
}
