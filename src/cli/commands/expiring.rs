use chrono::Utc;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::{CliContext, OutputFormat};
use crate::inventory::{ExpirationStatus, Item};

pub async fn handle(ctx: &CliContext, days: i64) -> anyhow::Result<()> {
    let split = ctx.source.expiring_items(days).await?;

    if split.expiring_count() == 0 && split.expired_count() == 0 {
        return output_empty_collection(
            &ctx.output,
            "expiringItems",
            &format!("Nothing expires within {} day(s)", days),
        );
    }

    match ctx.output {
        OutputFormat::Json => output_success(
            &ctx.output,
            &format!(
                "{} expiring, {} expired",
                split.expiring_count(),
                split.expired_count()
            ),
            Some(&split),
        ),
        OutputFormat::Text => {
            println!("Expiring within {} day(s): {}", days, split.expiring_count());
            for item in &split.expiring_items {
                println!("  {}", line(item));
            }
            println!("Expired: {}", split.expired_count());
            for item in &split.expired_items {
                println!("  {}", line(item));
            }
            Ok(())
        }
    }
}

fn line(item: &Item) -> String {
    let when = item
        .expiration_date
        .map(|date| ExpirationStatus::classify(date, Utc::now()).label())
        .unwrap_or_default();
    format!("{} {} - {}", item.category.icon(), item.name, when)
}
