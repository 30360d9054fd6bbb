use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::utils::identity_filter::{code_key, email_key};

/// Keys from `identity_filter::{email_key, code_key}` known to be taken.
pub static IDENTITY_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub async fn mark_taken(key: &str) {
    IDENTITY_CACHE.insert(key.to_owned(), true).await;
}

pub async fn is_taken(key: &str) -> bool {
    IDENTITY_CACHE.get(key).await.unwrap_or(false)
}

async fn batch_mark(keys: &[String]) {
    let futures: Vec<_> = keys
        .iter()
        .map(|k| IDENTITY_CACHE.insert(k.clone(), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load identities of users who logged in recently (batched)
pub async fn warmup_identity_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT email, employee_code
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size * 2);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (email, employee_code) = row?;
        batch.push(email_key(&email));
        batch.push(code_key(&employee_code));
        total_count += 1;

        if batch.len() >= batch_size * 2 {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Identity cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}
