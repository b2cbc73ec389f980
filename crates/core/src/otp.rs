//! One-time code challenges with wall-clock TTLs.
//!
//! A challenge is a small value object replaced wholesale on the booking
//! record under the store's version check, never mutated field by field.
//! "Waiting" for a code is always a comparison against the stored expiry,
//! never a suspended call, so behavior survives process restarts.

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// What a challenge authorizes, and therefore who receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    /// Customer consent for the worker to begin in-person work.
    /// Delivered to the customer. TTL 10 minutes.
    ServiceStart,
    /// Worker confirmation of a cash payment. Delivered to the worker so
    /// the customer cannot self-certify. TTL 30 minutes.
    CashSettlement,
}

impl OtpPurpose {
    pub fn ttl(self) -> Duration {
        match self {
            OtpPurpose::ServiceStart => Duration::minutes(10),
            OtpPurpose::CashSettlement => Duration::minutes(30),
        }
    }
}

/// A short-lived shared secret: 6-digit numeric code plus expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub purpose: OtpPurpose,
}

impl OtpChallenge {
    /// Issue a fresh challenge for `purpose`, expiring `purpose.ttl()` from `now`.
    pub fn issue(purpose: OtpPurpose, now: OffsetDateTime) -> Self {
        OtpChallenge {
            code: generate_code(),
            expires_at: now + purpose.ttl(),
            purpose,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// True when the submitted code matches and the challenge is still live.
    pub fn matches(&self, submitted: &str, now: OffsetDateTime) -> bool {
        !self.is_expired(now) && self.code == submitted
    }
}

/// Generate a 6-digit numeric code, zero-padded ("000000".."999999").
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn service_start_expires_after_ten_minutes() {
        let now = datetime!(2024-01-15 10:00 UTC);
        let c = OtpChallenge::issue(OtpPurpose::ServiceStart, now);
        assert!(!c.is_expired(now + Duration::minutes(10)));
        assert!(c.is_expired(now + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn cash_settlement_expires_after_thirty_minutes() {
        let now = datetime!(2024-01-15 10:00 UTC);
        let c = OtpChallenge::issue(OtpPurpose::CashSettlement, now);
        assert!(!c.is_expired(now + Duration::minutes(30)));
        assert!(c.is_expired(now + Duration::minutes(31)));
    }

    #[test]
    fn matches_requires_both_code_and_liveness() {
        let now = datetime!(2024-01-15 10:00 UTC);
        let c = OtpChallenge {
            code: "483920".to_string(),
            expires_at: now + Duration::minutes(10),
            purpose: OtpPurpose::ServiceStart,
        };
        assert!(c.matches("483920", now));
        assert!(!c.matches("000000", now));
        assert!(!c.matches("483920", now + Duration::minutes(11)));
    }
}
