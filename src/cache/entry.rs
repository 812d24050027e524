//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// TTL applied when a write does not ask for one, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 5 * 60;

// == Expiry ==
/// Absolute expiry of a cache entry.
///
/// Persisted as a millisecond timestamp, or `false` for entries that never
/// expire. `null` is accepted on load as a synonym for `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Expires at this Unix timestamp in milliseconds
    At(u64),
    /// Never expires
    Never,
}

impl Expiry {
    pub fn timestamp_ms(&self) -> Option<u64> {
        match self {
            Expiry::At(ms) => Some(*ms),
            Expiry::Never => None,
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expiry::At(ms) => serializer.serialize_u64(*ms),
            Expiry::Never => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExpiryVisitor;

        impl<'de> Visitor<'de> for ExpiryVisitor {
            type Value = Expiry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a millisecond timestamp, false or null")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Expiry, E> {
                Ok(Expiry::At(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Expiry, E> {
                u64::try_from(v)
                    .map(Expiry::At)
                    .map_err(|_| E::custom("negative expiry timestamp"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Expiry, E> {
                if v.is_finite() && v >= 0.0 {
                    Ok(Expiry::At(v as u64))
                } else {
                    Err(E::custom("invalid expiry timestamp"))
                }
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Expiry, E> {
                if v {
                    Err(E::custom("`true` is not a valid expiry"))
                } else {
                    Ok(Expiry::Never)
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<Expiry, E> {
                Ok(Expiry::Never)
            }

            fn visit_none<E: de::Error>(self) -> Result<Expiry, E> {
                Ok(Expiry::Never)
            }
        }

        deserializer.deserialize_any(ExpiryVisitor)
    }
}

// == Expires Option ==
/// Per-write lifetime requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expires {
    /// Expire after this many seconds
    After(u64),
    /// Disable expiry for this write
    Never,
}

impl Expires {
    /// Resolves the absolute expiry for a write happening at `now_ms`.
    ///
    /// `None` and a zero TTL both fall back to `default_ttl_secs`. Lifetimes
    /// too large to represent saturate at `u64::MAX`.
    pub fn resolve(requested: Option<Expires>, default_ttl_secs: u64, now_ms: u64) -> Expiry {
        let secs = match requested {
            Some(Expires::Never) => return Expiry::Never,
            Some(Expires::After(secs)) if secs > 0 => secs,
            _ => default_ttl_secs.max(1),
        };
        Expiry::At(now_ms.saturating_add(secs.saturating_mul(1000)))
    }
}

// == Cache Entry ==
/// Represents a single cache entry: a raw payload and when it stops being usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Expiration (Unix milliseconds or never)
    #[serde(rename = "expiresAt", alias = "expires", default = "never")]
    pub expires_at: Expiry,
    /// The payload reapplied to a resource on a hit
    pub value: Value,
}

fn never() -> Expiry {
    Expiry::Never
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now_ms`.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `expires` - Requested lifetime (`None` = default TTL)
    /// * `default_ttl_secs` - TTL used when none is requested
    /// * `now_ms` - Write time in Unix milliseconds
    pub fn new(value: Value, expires: Option<Expires>, default_ttl_secs: u64, now_ms: u64) -> Self {
        Self {
            expires_at: Expires::resolve(expires, default_ttl_secs, now_ms),
            value,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: the entry is expired the instant `now_ms >= expires_at`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Expiry::At(expires) => now_ms >= expires,
            Expiry::Never => false,
        }
    }

    /// Returns true if the entry can still be served at `now_ms`.
    pub fn is_usable(&self, now_ms: u64) -> bool {
        !self.is_expired(now_ms)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .timestamp_ms()
            .map(|expires| expires.saturating_sub(now_ms))
    }
}
