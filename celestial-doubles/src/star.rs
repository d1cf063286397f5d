//! Star and candidate records plus their fixed on-disk layout.
//!
//! Both record types are stored little-endian with explicit offsets so a
//! bucket written on one machine reads back identically on another:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0  | 8 | right ascension (f64, radians) |
//! | 8  | 8 | declination (f64, radians) |
//! | 16 | 4 | magnitude (i32, thousandths) |
//! | 20 | 4 | proper motion in RA (i32, mas/yr) |
//! | 24 | 4 | proper motion in Dec (i32, mas/yr) |
//! | 28 | 4 | sequence number within zone (u32) |
//! | 32 | 2 | zone (u16) |
//! | 34 | 1 | magnitude source (u8) |
//! | 35 | 1 | double-star flag (u8) |
//! | 36 | 4 | reserved |
//!
//! A candidate appends its home bucket key (two i32) for 48 bytes total.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::region::BucketKey;

pub const STAR_RECORD_SIZE: usize = 40;
pub const CANDIDATE_RECORD_SIZE: usize = STAR_RECORD_SIZE + 8;

/// Where a star's magnitude came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagSource {
    /// Photometric survey measurement (APASS V).
    Survey,
    /// Catalog model magnitude, used when no survey value exists.
    Model,
}

impl MagSource {
    fn to_byte(self) -> u8 {
        match self {
            MagSource::Survey => 0,
            MagSource::Model => 1,
        }
    }

    fn from_byte(b: u8) -> Self {
        if b == 0 {
            MagSource::Survey
        } else {
            MagSource::Model
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MagSource::Survey => "APASS",
            MagSource::Model => "UCAC4_M",
        }
    }
}

/// Catalog identity of a star: zone plus 1-based running number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogId {
    pub zone: u16,
    pub seq: u32,
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}-{:06}", self.zone, self.seq)
    }
}

/// A single catalog star.
///
/// Magnitude and proper motion are always present; a proper motion of
/// zero in both axes means "not measured".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarRecord {
    /// Right ascension in radians, `[0, 2π)`.
    pub ra: f64,
    /// Declination in radians, `[-π/2, π/2]`.
    pub dec: f64,
    /// Visual magnitude in thousandths (12000 = 12.0 mag).
    pub mag: i32,
    pub mag_source: MagSource,
    /// Proper motion in right ascension, mas/yr.
    pub pm_ra: i32,
    /// Proper motion in declination, mas/yr.
    pub pm_dec: i32,
    /// The source catalog's own double-star flag.
    pub double_flag: u8,
    pub id: CatalogId,
}

impl StarRecord {
    pub fn has_proper_motion(&self) -> bool {
        self.pm_ra != 0 || self.pm_dec != 0
    }

    pub fn is_same_star(&self, other: &StarRecord) -> bool {
        self.id == other.id
    }

    pub fn encode(&self, buf: &mut [u8; STAR_RECORD_SIZE]) {
        LittleEndian::write_f64(&mut buf[0..8], self.ra);
        LittleEndian::write_f64(&mut buf[8..16], self.dec);
        LittleEndian::write_i32(&mut buf[16..20], self.mag);
        LittleEndian::write_i32(&mut buf[20..24], self.pm_ra);
        LittleEndian::write_i32(&mut buf[24..28], self.pm_dec);
        LittleEndian::write_u32(&mut buf[28..32], self.id.seq);
        LittleEndian::write_u16(&mut buf[32..34], self.id.zone);
        buf[34] = self.mag_source.to_byte();
        buf[35] = self.double_flag;
        buf[36..40].fill(0);
    }

    pub fn decode(buf: &[u8; STAR_RECORD_SIZE]) -> Self {
        StarRecord {
            ra: LittleEndian::read_f64(&buf[0..8]),
            dec: LittleEndian::read_f64(&buf[8..16]),
            mag: LittleEndian::read_i32(&buf[16..20]),
            pm_ra: LittleEndian::read_i32(&buf[20..24]),
            pm_dec: LittleEndian::read_i32(&buf[24..28]),
            id: CatalogId {
                seq: LittleEndian::read_u32(&buf[28..32]),
                zone: LittleEndian::read_u16(&buf[32..34]),
            },
            mag_source: MagSource::from_byte(buf[34]),
            double_flag: buf[35],
        }
    }
}

/// A potential primary: a bright star tagged with the bucket it lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateRecord {
    pub star: StarRecord,
    pub bucket: BucketKey,
}

impl CandidateRecord {
    pub fn encode(&self, buf: &mut [u8; CANDIDATE_RECORD_SIZE]) {
        let mut star_buf = [0u8; STAR_RECORD_SIZE];
        self.star.encode(&mut star_buf);
        buf[..STAR_RECORD_SIZE].copy_from_slice(&star_buf);
        LittleEndian::write_i32(&mut buf[40..44], self.bucket.ra);
        LittleEndian::write_i32(&mut buf[44..48], self.bucket.dec);
    }

    pub fn decode(buf: &[u8; CANDIDATE_RECORD_SIZE]) -> Self {
        let mut star_buf = [0u8; STAR_RECORD_SIZE];
        star_buf.copy_from_slice(&buf[..STAR_RECORD_SIZE]);
        CandidateRecord {
            star: StarRecord::decode(&star_buf),
            bucket: BucketKey {
                ra: LittleEndian::read_i32(&buf[40..44]),
                dec: LittleEndian::read_i32(&buf[44..48]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_star() -> StarRecord {
        StarRecord {
            ra: 6.283185,
            dec: -1.570796,
            mag: 11_234,
            mag_source: MagSource::Model,
            pm_ra: -32_768,
            pm_dec: 1_234,
            double_flag: 7,
            id: CatalogId {
                zone: 900,
                seq: 1_000_001,
            },
        }
    }

    #[test]
    fn test_star_fields_survive_encoding() {
        let star = sample_star();
        let mut buf = [0u8; STAR_RECORD_SIZE];
        star.encode(&mut buf);
        assert_eq!(StarRecord::decode(&buf), star);
        assert_eq!(&buf[36..40], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_candidate_carries_bucket() {
        let candidate = CandidateRecord {
            star: sample_star(),
            bucket: BucketKey { ra: 0, dec: -1 },
        };
        let mut buf = [0u8; CANDIDATE_RECORD_SIZE];
        candidate.encode(&mut buf);
        let back = CandidateRecord::decode(&buf);
        assert_eq!(back.bucket, BucketKey { ra: 0, dec: -1 });
        assert_eq!(back.star.id, candidate.star.id);
    }

    #[test]
    fn test_zero_motion_means_unmeasured() {
        let mut star = sample_star();
        assert!(star.has_proper_motion());
        star.pm_ra = 0;
        star.pm_dec = 0;
        assert!(!star.has_proper_motion());
    }

    #[test]
    fn test_identity_is_zone_and_sequence() {
        let a = sample_star();
        let mut b = a;
        b.ra += 1e-6;
        assert!(a.is_same_star(&b));
        b.id.zone = 899;
        assert!(!a.is_same_star(&b));
    }

    #[test]
    fn test_catalog_id_display() {
        let id = CatalogId { zone: 12, seq: 345 };
        assert_eq!(id.to_string(), "012-000345");
    }
}
