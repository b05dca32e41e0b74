use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::Config;
use crate::models::handover::OtpChallenge;

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: u32,
}

impl OtpPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl: Duration::seconds(config.otp_ttl_secs),
            max_attempts: config.otp_max_attempts,
        }
    }

    pub fn issue(&self, now: DateTime<Utc>) -> OtpChallenge {
        OtpChallenge {
            code: generate_code(),
            issued_at: now,
            expires_at: now + self.ttl,
            failed_attempts: 0,
        }
    }

    /// A live challenge can still be verified.
    pub fn is_live(&self, challenge: &OtpChallenge, now: DateTime<Utc>) -> bool {
        now < challenge.expires_at && challenge.failed_attempts < self.max_attempts
    }

    /// Checks `submitted` against the challenge. Only a mismatch mutates the
    /// challenge (its failure counter).
    pub fn check(
        &self,
        challenge: &mut OtpChallenge,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> OtpCheck {
        if challenge.failed_attempts >= self.max_attempts {
            return OtpCheck::Exhausted;
        }
        if now >= challenge.expires_at {
            return OtpCheck::Expired;
        }
        if challenge.code == submitted {
            return OtpCheck::Accepted;
        }

        challenge.failed_attempts += 1;
        OtpCheck::Rejected {
            attempts_left: self.max_attempts - challenge.failed_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Accepted,
    Rejected { attempts_left: u32 },
    Expired,
    Exhausted,
}

impl OtpCheck {
    pub fn outcome_label(self) -> &'static str {
        match self {
            OtpCheck::Accepted => "accepted",
            OtpCheck::Rejected { .. } => "rejected",
            OtpCheck::Expired => "expired",
            OtpCheck::Exhausted => "exhausted",
        }
    }
}

/// Six digits, uniform over `OTP_MIN..=OTP_MAX`.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}
