use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Upper bound for `OTP_TTL_SECS` (one day).
pub const MAX_OTP_TTL_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_queue_size: usize,
    pub realtime_buffer_size: usize,
    pub listing_cache_ttl_secs: u64,
    pub otp_ttl_secs: i64,
    pub otp_max_attempts: u32,
    pub static_dir: String,
    pub admin_email: Option<String>,
    pub admin_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_queue_size: 1024,
            realtime_buffer_size: 1024,
            listing_cache_ttl_secs: 300,
            otp_ttl_secs: 900,
            otp_max_attempts: 5,
            static_dir: "static".to_string(),
            admin_email: None,
            admin_name: "Admin".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Ok(raw) if raw.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            Ok(raw) => {
                return Err(AppError::Internal(format!("invalid LOG_FORMAT: {raw}")));
            }
            Err(_) => defaults.log_format,
        };

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_queue_size: parse_or_default("EVENT_QUEUE_SIZE", defaults.event_queue_size)?,
            realtime_buffer_size: parse_or_default(
                "REALTIME_BUFFER_SIZE",
                defaults.realtime_buffer_size,
            )?,
            listing_cache_ttl_secs: parse_or_default(
                "LISTING_CACHE_TTL_SECS",
                defaults.listing_cache_ttl_secs,
            )?,
            otp_ttl_secs: parse_or_default("OTP_TTL_SECS", defaults.otp_ttl_secs)?,
            otp_max_attempts: parse_or_default("OTP_MAX_ATTEMPTS", defaults.otp_max_attempts)?,
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_name: env::var("ADMIN_NAME").unwrap_or(defaults.admin_name),
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.event_queue_size == 0 {
            return Err(invalid("EVENT_QUEUE_SIZE", "must be > 0"));
        }
        if self.realtime_buffer_size == 0 {
            return Err(invalid("REALTIME_BUFFER_SIZE", "must be > 0"));
        }
        if !(1..=MAX_OTP_TTL_SECS).contains(&self.otp_ttl_secs) {
            return Err(invalid(
                "OTP_TTL_SECS",
                &format!("must be between 1 and {MAX_OTP_TTL_SECS}"),
            ));
        }
        if self.otp_max_attempts == 0 {
            return Err(invalid("OTP_MAX_ATTEMPTS", "must be > 0"));
        }
        Ok(())
    }

    pub fn listing_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_cache_ttl_secs)
    }
}

fn invalid(key: &str, reason: &str) -> AppError {
    AppError::Internal(format!("invalid {key}: {reason}"))
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
