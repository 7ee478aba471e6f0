//! Loan records and the generator that synthesizes them

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const ADDRESS_ALPHABET: &[u8] = b"abcdef0123456789";
const ADDRESS_SUFFIX_LEN: usize = 8;

pub const AMOUNT_MIN: f64 = 0.1;
pub const AMOUNT_MAX: f64 = 10.0;

// Draws at or above this bound would round up to AMOUNT_MAX.
const AMOUNT_DRAW_MAX: f64 = AMOUNT_MAX - 0.005;
const AMOUNT_CEIL: f64 = 9.99;

/// Kind of account a simulated flash loan is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountKind {
    #[default]
    Wallet,
    Smart,
}

impl AccountKind {
    pub fn from_flag(is_smart: bool) -> Self {
        if is_smart {
            AccountKind::Smart
        } else {
            AccountKind::Wallet
        }
    }

    pub fn is_smart(&self) -> bool {
        matches!(self, AccountKind::Smart)
    }

    pub fn address_prefix(&self) -> &'static str {
        match self {
            AccountKind::Wallet => "0x",
            AccountKind::Smart => "smart_0x",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            AccountKind::Wallet => AccountKind::Smart,
            AccountKind::Smart => AccountKind::Wallet,
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AccountKind::Wallet => "Wallet",
                AccountKind::Smart => "Smart",
            }
        )
    }
}

/// A single simulated flash loan.
///
/// Fields are read-only: a record is built once by [`generate`] (or decoded
/// from a store) and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    user_address: String,
    #[serde(rename = "amount")]
    amount_eth: f64,
    #[serde(rename = "time", with = "iso_millis")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "smart")]
    is_smart_account: bool,
}

impl LoanRecord {
    pub fn user_address(&self) -> &str {
        &self.user_address
    }

    pub fn amount_eth(&self) -> f64 {
        self.amount_eth
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_smart_account(&self) -> bool {
        self.is_smart_account
    }

    pub fn kind(&self) -> AccountKind {
        AccountKind::from_flag(self.is_smart_account)
    }
}

/// Generates a record for `kind` using the thread-local RNG and the current time.
pub fn generate(kind: AccountKind) -> LoanRecord {
    generate_with(&mut rand::thread_rng(), Utc::now(), kind)
}

/// Generates a record from an explicit random source and creation instant.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    now: DateTime<Utc>,
    kind: AccountKind,
) -> LoanRecord {
    LoanRecord {
        user_address: random_address(rng, kind),
        amount_eth: random_amount(rng),
        timestamp: now.trunc_subsecs(3),
        is_smart_account: kind.is_smart(),
    }
}

fn random_address<R: Rng + ?Sized>(rng: &mut R, kind: AccountKind) -> String {
    let prefix = kind.address_prefix();
    let mut address = String::with_capacity(prefix.len() + ADDRESS_SUFFIX_LEN);
    address.push_str(prefix);
    for _ in 0..ADDRESS_SUFFIX_LEN {
        let idx = rng.gen_range(0..ADDRESS_ALPHABET.len());
        address.push(ADDRESS_ALPHABET[idx] as char);
    }
    address
}

fn random_amount<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round_to_cents(rng.gen_range(AMOUNT_MIN..AMOUNT_DRAW_MAX)).min(AMOUNT_CEIL)
}

/// Rounds to two decimal places, half away from zero.
///
/// Rounding operates on the binary value: `0.125` is an exact midpoint and
/// becomes `0.13`, while the literal `1.005` is stored slightly below its
/// midpoint and becomes `1.0`.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serde adapter for ISO-8601 timestamps with millisecond precision.
///
/// Encodes as `YYYY-MM-DDTHH:MM:SS.mmmZ`. Decodes any RFC 3339 offset and
/// reads offset-less values (Postgres `timestamp` columns) as UTC.
pub(crate) mod iso_millis {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
