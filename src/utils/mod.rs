pub mod calendar;
pub mod identity_cache;
pub mod identity_filter;
