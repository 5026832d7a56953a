//! Registry request signing via timestamp and keyed hash
//!
//! # Authentication contract
//!
//! Every registry call carries four fields:
//! - `id`: application identifier issued by the federation
//! - `serie`: per-process session identifier (15 chars, `A-Z0-9`)
//! - `tm`: local timestamp `YYYYMMDDhhmmss` + 3-digit milliseconds
//! - `tmc`: hex HMAC-SHA1 of `tm`, keyed by the hex MD5 of the password
//!
//! The key is the lower-case hex *string* of the MD5 digest, not the raw
//! digest bytes. The registry recomputes it the same way.
//!
//! # Pure Functions
//!
//! Everything here is a pure function of (secret, instant) apart from
//! [`SessionId::generate`] and [`Signer::credentials`], which read the RNG
//! and the clock respectively.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Timelike};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use rand::Rng;
use sha1::Sha1;

use crate::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// Length of the `serie` session identifier
pub const SESSION_ID_LEN: usize = 15;

const SESSION_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// ========================================
// Session Identifier
// ========================================

/// Per-process session identifier sent as `serie`
///
/// Generated once at startup and reused for every call. Not a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a random 15-character uppercase-alphanumeric identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use fftt_common::signer::SessionId;
    ///
    /// let serie = SessionId::generate();
    /// assert_eq!(serie.as_str().len(), 15);
    /// assert!(serie
    ///     .as_str()
    ///     .chars()
    ///     .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    /// ```
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let value = (0..SESSION_ID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..SESSION_ID_CHARSET.len());
                SESSION_ID_CHARSET[idx] as char
            })
            .collect();
        Self(value)
    }

    /// Wrap an existing identifier (fixed values in tests, replayed sessions)
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ========================================
// Shared Secret
// ========================================

/// Registry password, only ever used to derive the signing key
///
/// `Debug` and `Display` are redacted so the value cannot leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wrap a password, rejecting empty or whitespace-only values
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::Config(
                "shared secret (MOT_DE_PASSE) is empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(***)")
    }
}

impl fmt::Display for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ========================================
// Timestamp and Signature
// ========================================

/// Render an instant as the registry's `tm` value
///
/// Format: `%Y%m%d%H%M%S` followed by zero-padded milliseconds. A leap
/// second is clamped to `hh:mm:59.999` so the value never shows second 60
/// and keeps exactly three millisecond digits.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, Utc, TimeZone};
/// use fftt_common::signer::format_timestamp;
///
/// let instant = Utc.from_utc_datetime(
///     &NaiveDate::from_ymd_opt(2024, 1, 2)
///         .unwrap()
///         .and_hms_milli_opt(3, 4, 5, 678)
///         .unwrap(),
/// );
/// assert_eq!(format_timestamp(&instant), "20240102030405678");
/// ```
pub fn format_timestamp<Tz>(instant: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    // A leap second carries nanoseconds >= 1e9 and `%S` would print 60
    let clamped = instant
        .with_nanosecond(instant.nanosecond().min(999_999_999))
        .unwrap_or_else(|| instant.clone());

    format!(
        "{}{:03}",
        clamped.format("%Y%m%d%H%M%S"),
        clamped.timestamp_subsec_millis()
    )
}

/// Derive the HMAC key: lower-case hex MD5 of the password text
pub fn signing_key(secret: &SharedSecret) -> String {
    format!("{:x}", Md5::digest(secret.expose().as_bytes()))
}

/// Compute `tmc` for a given `tm`
///
/// # Algorithm
///
/// 1. MD5 the password, hex-encode (lower case)
/// 2. Use the hex string's ASCII bytes as HMAC key
/// 3. HMAC-SHA1 over the timestamp string
/// 4. Return as 40 hex characters
pub fn sign(secret: &SharedSecret, timestamp: &str) -> String {
    let key = signing_key(secret);

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());

    format!("{:x}", mac.finalize().into_bytes())
}

// ========================================
// Signer
// ========================================

/// Authentication fields for one registry call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedParams {
    pub id: String,
    pub serie: String,
    pub tm: String,
    pub tmc: String,
}

impl SignedParams {
    /// Query pairs in wire order
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("id", self.id.as_str()),
            ("serie", self.serie.as_str()),
            ("tm", self.tm.as_str()),
            ("tmc", self.tmc.as_str()),
        ]
    }
}

/// Produces fresh credentials for each registry call
///
/// Holds only immutable startup values, so one instance is shared by all
/// concurrent requests without locking.
#[derive(Debug, Clone)]
pub struct Signer {
    app_id: String,
    secret: SharedSecret,
    session: SessionId,
}

impl Signer {
    pub fn new(app_id: impl Into<String>, secret: SharedSecret, session: SessionId) -> Self {
        Self {
            app_id: app_id.into(),
            secret,
            session,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Credentials for a specific instant
    pub fn credentials_at<Tz>(&self, instant: &DateTime<Tz>) -> SignedParams
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let tm = format_timestamp(instant);
        let tmc = sign(&self.secret, &tm);
        SignedParams {
            id: self.app_id.clone(),
            serie: self.session.as_str().to_string(),
            tm,
            tmc,
        }
    }

    /// Credentials for the current local time
    pub fn credentials(&self) -> SignedParams {
        self.credentials_at(&Local::now())
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    fn instant(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_milli_opt(h, m, s, ms)
                .unwrap(),
        )
    }

    fn secret(value: &str) -> SharedSecret {
        SharedSecret::new(value).unwrap()
    }

    #[test]
    fn test_timestamp_concrete_value() {
        assert_eq!(format_timestamp(&instant(3, 4, 5, 678)), "20240102030405678");
    }

    #[test]
    fn test_timestamp_zero_padding() {
        assert_eq!(format_timestamp(&instant(0, 0, 0, 7)), "20240102000000007");
        assert_eq!(format_timestamp(&instant(9, 9, 9, 0)), "20240102090909000");
    }

    #[test]
    fn test_timestamp_is_17_digits() {
        let ts = format_timestamp(&Local::now());
        assert_eq!(ts.len(), 17);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_timestamp_non_decreasing() {
        let start = instant(23, 59, 58, 990);
        let mut previous = format_timestamp(&start);
        for step in 1..2000 {
            let next = format_timestamp(&(start + Duration::milliseconds(step)));
            assert!(next >= previous, "{} < {}", next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_timestamp_leap_second_clamped() {
        let leap = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2016, 12, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 1500)
                .unwrap(),
        );
        assert_eq!(format_timestamp(&leap), "20161231235959999");

        // Stays ordered between the second before and the second after
        let before = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2016, 12, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 500)
                .unwrap(),
        );
        let after = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2017, 1, 1)
                .unwrap()
                .and_hms_milli_opt(0, 0, 0, 0)
                .unwrap(),
        );
        assert!(format_timestamp(&before) <= format_timestamp(&leap));
        assert!(format_timestamp(&leap) < format_timestamp(&after));
    }

    #[test]
    fn test_signing_key_is_hex_md5() {
        assert_eq!(signing_key(&secret("swordfish")), "15b29ffdce66e10527a65bc6d71ad94d");
    }

    #[test]
    fn test_signature_golden_vector() {
        assert_eq!(
            sign(&secret("swordfish"), "20240102030405678"),
            "7bd1807ec7ae9330e80662677efa089005a59990"
        );
        assert_eq!(
            sign(&secret("secret"), "20240102030405678"),
            "2a508e7eebc19f83998d42994adc72cb8a35a26f"
        );
    }

    #[test]
    fn test_signature_deterministic() {
        let s = secret("swordfish");
        let a = sign(&s, "20240102030405678");
        let b = sign(&s, "20240102030405678");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        // Different timestamp, different signature
        assert_ne!(a, sign(&s, "20240102030405679"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SharedSecret::new("").is_err());
        assert!(SharedSecret::new("   ").is_err());
        assert!(SharedSecret::new("x").is_ok());
    }

    #[test]
    fn test_secret_redacted_in_debug() {
        let s = secret("swordfish");
        assert!(!format!("{:?}", s).contains("swordfish"));
        assert!(!format!("{}", s).contains("swordfish"));
    }

    #[test]
    fn test_session_id_shape() {
        for _ in 0..50 {
            let serie = SessionId::generate();
            assert_eq!(serie.as_str().len(), SESSION_ID_LEN);
            assert!(serie
                .as_str()
                .bytes()
                .all(|b| SESSION_ID_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn test_signer_credentials() {
        let signer = Signer::new(
            "SW999",
            secret("swordfish"),
            SessionId::new("ABCDEFGHIJKLMNO"),
        );
        let creds = signer.credentials_at(&instant(3, 4, 5, 678));

        assert_eq!(creds.id, "SW999");
        assert_eq!(creds.serie, "ABCDEFGHIJKLMNO");
        assert_eq!(creds.tm, "20240102030405678");
        assert_eq!(creds.tmc, "7bd1807ec7ae9330e80662677efa089005a59990");

        let keys: Vec<_> = creds.pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["id", "serie", "tm", "tmc"]);
    }

    #[test]
    fn test_signer_reuses_session() {
        let signer = Signer::new("SW999", secret("pw"), SessionId::generate());
        let a = signer.credentials();
        let b = signer.credentials();
        assert_eq!(a.serie, b.serie);
        assert_eq!(a.serie, signer.session().as_str());
    }
}
