use anyhow::Result;

use listing_watch_core::store::{RecordStore, SubscriberStore};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Print every stored listing, oldest first.
pub async fn run_list(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let records = store.find_all().await?;

    if records.is_empty() {
        println!("No listings stored yet.");
    } else {
        println!("{} listings stored:", records.len());
        for r in &records {
            println!(
                "  {:<24} {} ({})  {}",
                r.car_id,
                r.title,
                r.year,
                r.price.as_deref().unwrap_or("-")
            );
            println!("  {:<24} {}", "", r.link);
        }
    }

    store.close().await;
    Ok(())
}

/// Print registered subscriber chat ids in registration order.
pub async fn run_subscribers(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let subs = store.list_subscribers().await?;

    println!("{} subscribers", subs.len());
    for s in &subs {
        println!("  {}", s.id);
    }

    store.close().await;
    Ok(())
}
