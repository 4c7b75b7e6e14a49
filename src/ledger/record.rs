//! Persisted ledger record format.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::ledger::LedgerError;
use crate::rules::DEFAULT_SOURCE;

/// Timestamp layout on disk: ISO-8601, UTC, whole seconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One row of the snapshot file, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Rate-limit key.
    pub origin_machine: String,
    /// Time of the last admitted forward.
    pub time_elapsed: String,
}

/// A decoded ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: String,
    pub last_admitted: DateTime<Utc>,
}

impl LedgerRecord {
    /// Encode an entry for storage. Sub-second precision is dropped.
    pub fn encode(key: &str, last_admitted: DateTime<Utc>) -> Self {
        Self {
            origin_machine: key.to_string(),
            time_elapsed: last_admitted
                .trunc_subsecs(0)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        }
    }

    /// Decode a stored record. `index` is the record's position, used in
    /// errors.
    pub fn decode(self, index: usize) -> Result<LedgerEntry, LedgerError> {
        let corrupt = |reason: String| LedgerError::Corrupt { index, reason };

        let key = if self.origin_machine == DEFAULT_SOURCE {
            self.origin_machine
        } else {
            match self.origin_machine.parse::<Ipv6Addr>() {
                Ok(addr) => addr.to_string(),
                Err(_) => return Err(corrupt(format!("bad key `{}`", self.origin_machine))),
            }
        };

        let naive = NaiveDateTime::parse_from_str(&self.time_elapsed, TIMESTAMP_FORMAT)
            .map_err(|e| corrupt(format!("bad timestamp `{}`: {}", self.time_elapsed, e)))?;

        Ok(LedgerEntry {
            key,
            last_admitted: naive.and_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encode_truncates_subseconds() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::TimeDelta::milliseconds(900);
        let record = LedgerRecord::encode("2001:db8::1", at);
        assert_eq!(record.time_elapsed, "2024-03-01T12:30:05");

        let entry = record.decode(0).unwrap();
        assert_eq!(entry.key, "2001:db8::1");
        assert_eq!(entry.last_admitted, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap());
    }

    #[test]
    fn decode_accepts_default_key() {
        let record = LedgerRecord {
            origin_machine: "DEFAULT".into(),
            time_elapsed: "2024-03-01T00:00:00".into(),
        };
        assert_eq!(record.decode(0).unwrap().key, "DEFAULT");
    }

    #[test]
    fn decode_canonicalizes_address_keys() {
        let record = LedgerRecord {
            origin_machine: "2001:0DB8:0000::0001".into(),
            time_elapsed: "2024-03-01T00:00:00".into(),
        };
        assert_eq!(record.decode(0).unwrap().key, "2001:db8::1");
    }

    #[test]
    fn decode_rejects_bad_rows() {
        let bad_key = LedgerRecord {
            origin_machine: "10.0.0.1".into(),
            time_elapsed: "2024-03-01T00:00:00".into(),
        };
        assert!(matches!(bad_key.decode(3), Err(LedgerError::Corrupt { index: 3, .. })));

        let bad_time = LedgerRecord {
            origin_machine: "DEFAULT".into(),
            time_elapsed: "yesterday".into(),
        };
        assert!(matches!(bad_time.decode(0), Err(LedgerError::Corrupt { .. })));
    }
}
