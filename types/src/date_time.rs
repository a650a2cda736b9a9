//! OPC UA `DateTime`: a signed 64-bit count of 100ns intervals since
//! 1601-01-01 00:00:00 UTC, the wire representation used by
//! `SecurityToken.createdAt` (§3.1) and token-lifetime checks (§4.5).

use std::io::{Read, Write};

use chrono::{DateTime as ChronoDateTime, TimeZone, Utc};

use crate::encoding::{DecodingOptions, SimpleBinaryDecodable, SimpleBinaryEncodable};
use crate::error::EncodingResult;

/// Ticks between the OPC UA epoch (1601-01-01) and the Unix epoch
/// (1970-01-01), in 100ns units.
const TICKS_TO_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

/// A point in time, stored as OPC UA's 100ns-tick `Int64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime {
    ticks: i64,
}

impl DateTime {
    /// The current time.
    pub fn now() -> DateTime {
        DateTime::from_chrono(&Utc::now())
    }

    /// Build from a `chrono::DateTime<Utc>`.
    pub fn from_chrono(dt: &ChronoDateTime<Utc>) -> DateTime {
        let unix_ticks = dt.timestamp() * 10_000_000 + (dt.timestamp_subsec_nanos() / 100) as i64;
        DateTime {
            ticks: unix_ticks + TICKS_TO_UNIX_EPOCH,
        }
    }

    /// View as a `chrono::DateTime<Utc>`.
    pub fn as_chrono(&self) -> ChronoDateTime<Utc> {
        let unix_ticks = self.ticks - TICKS_TO_UNIX_EPOCH;
        let secs = unix_ticks / 10_000_000;
        let nanos = (unix_ticks.rem_euclid(10_000_000)) * 100;
        Utc.timestamp_opt(secs, nanos as u32).single().unwrap_or(Utc::now())
    }

    /// Milliseconds since the Unix epoch, the unit `SecurityToken.createdAt`
    /// is specified in (§3.1).
    pub fn as_unix_millis(&self) -> i64 {
        (self.ticks - TICKS_TO_UNIX_EPOCH) / 10_000
    }

    /// Build from milliseconds since the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> DateTime {
        DateTime {
            ticks: millis * 10_000 + TICKS_TO_UNIX_EPOCH,
        }
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime { ticks: 0 }
    }
}

impl SimpleBinaryEncodable for DateTime {
    fn byte_len(&self) -> usize {
        8
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        self.ticks.encode(stream)
    }
}

impl SimpleBinaryDecodable for DateTime {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let ticks = i64::decode(stream, decoding_options)?;
        Ok(DateTime { ticks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        let now_ms = 1_700_000_000_123i64;
        let dt = DateTime::from_unix_millis(now_ms);
        assert_eq!(dt.as_unix_millis(), now_ms);
    }
}
