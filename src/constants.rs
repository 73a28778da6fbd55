use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

/// Process start; the health check reports uptime against it.
pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);
