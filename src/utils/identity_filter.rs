use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static IDENTITY_FILTER: Lazy<RwLock<CuckooFilter<str>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Filter/cache key for an email address.
pub fn email_key(email: &str) -> String {
    format!("email:{}", email.trim().to_lowercase())
}

/// Filter/cache key for an employee code.
pub fn code_key(employee_code: &str) -> String {
    format!("code:{}", employee_code.trim().to_lowercase())
}

/// Check if a key might be registered (false positives possible)
pub fn might_exist(key: &str) -> bool {
    IDENTITY_FILTER
        .read()
        .expect("identity filter poisoned")
        .contains(key)
}

pub fn insert(key: &str) {
    IDENTITY_FILTER
        .write()
        .expect("identity filter poisoned")
        .add(key);
}

/// Load every registered email and employee code, streaming in batches
pub async fn warmup_identity_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String, String)>("SELECT email, employee_code FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size * 2);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email, employee_code) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(email_key(&email));
        batch.push(code_key(&employee_code));
        total += 1;

        if batch.len() >= batch_size * 2 {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Identity filter warmup complete: {} users", total);
    Ok(())
}

fn insert_batch(keys: &[String]) {
    let mut filter = IDENTITY_FILTER.write().expect("identity filter poisoned");

    for key in keys {
        filter.add(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalized_and_namespaced() {
        assert_eq!(email_key(" Jane@X.io "), "email:jane@x.io");
        assert_eq!(code_key("emp001"), "code:emp001");
        assert_ne!(email_key("a"), code_key("a"));
    }

    #[test]
    fn inserted_keys_are_reported() {
        let key = email_key("filter-test-only@x.io");
        assert!(!might_exist(&key));

        insert(&key);
        assert!(might_exist(&key));
    }
}
