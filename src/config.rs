use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{FixedOffset, NaiveTime};
use dotenvy::dotenv;

use crate::attendance::AttendancePolicy;

#[derive(Clone)]
pub struct Config {
    /// Unset selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    // Office policy
    pub check_in_cutoff: NaiveTime,
    pub half_day_hours: f64,
    pub office_utc_offset_minutes: i32,
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parse_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            check_in_cutoff: parse_or(
                "CHECK_IN_CUTOFF",
                AttendancePolicy::default().check_in_cutoff,
            )?,
            half_day_hours: parse_or("HALF_DAY_HOURS", 4.0)?,
            office_utc_offset_minutes: parse_or("OFFICE_UTC_OFFSET_MINUTES", 0)?,
        };

        config.policy()?;
        Ok(config)
    }

    /// Office rules for status derivation.
    pub fn policy(&self) -> anyhow::Result<AttendancePolicy> {
        let utc_offset = self
            .office_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                anyhow!(
                    "OFFICE_UTC_OFFSET_MINUTES out of range: {}",
                    self.office_utc_offset_minutes
                )
            })?;

        if !(self.half_day_hours >= 0.0 && self.half_day_hours <= 24.0) {
            return Err(anyhow!(
                "HALF_DAY_HOURS must be between 0 and 24, got {}",
                self.half_day_hours
            ));
        }

        Ok(AttendancePolicy {
            check_in_cutoff: self.check_in_cutoff,
            half_day_hours: self.half_day_hours,
            utc_offset,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 1000,
        rate_register_per_min: 1000,
        rate_refresh_per_min: 1000,
        rate_protected_per_min: 1000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
        check_in_cutoff: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
        half_day_hours: 4.0,
        office_utc_offset_minutes: 0,
    }
}
