//! Roughly one-square-degree sky regions ("buckets").
//!
//! A star's home bucket is `(floor(ra° · cos δ), floor(δ°) + 89)`. Stars
//! within a fixed margin of a bucket border are also copied into the
//! bucket across that border, so a proximity scan of a single bucket sees
//! every true neighbour of the stars homed there.
//!
//! - [`store`] maps keys to files and owns all bucket/candidate I/O
//! - [`partition`] streams catalog stars into buckets and the candidate list

pub mod partition;
pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{corrected_ra_deg, normalize_ra};

pub use partition::{PartitionStats, Partitioner};
pub use store::{BucketReader, BucketStore, BucketWriter, CandidateReader, CandidateWriter};

/// Offset that maps `floor(δ°)` onto the declination index.
pub const DEC_OFFSET: i32 = 89;

/// Identity of a bucket: integer corrected-RA degree and offset declination degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub ra: i32,
    pub dec: i32,
}

impl BucketKey {
    /// Home bucket of a position given in radians.
    pub fn for_position(ra_rad: f64, dec_rad: f64) -> Self {
        let ra = libm::floor(corrected_ra_deg(ra_rad, dec_rad)) as i32;
        let dec = libm::floor(dec_rad.to_degrees()) as i32 + DEC_OFFSET;
        BucketKey { ra, dec }
    }

    /// Southern edge of the bucket in whole degrees.
    pub fn dec_floor_deg(&self) -> i32 {
        self.dec - DEC_OFFSET
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}_s{}", self.ra, self.dec)
    }
}

/// Buckets a star must be copied into besides its home.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginTargets {
    /// Distinct neighbour keys, never including the home bucket.
    pub keys: Vec<BucketKey>,
    /// Set when a declination neighbour would lie beyond a pole.
    pub pole_clamped: bool,
}

/// Compute the neighbour buckets a star at `(ra_rad, dec_rad)` is replicated into.
///
/// The star is copied into every bucket that overlaps the open box of
/// `±margin_deg` in declination and `±margin_deg / cos δ` in right
/// ascension around it, so a star exactly `margin_deg` from a border stays
/// home. Bucket borders are lines of constant corrected RA, which slant
/// across a band away from the equator; the box is binned band by band
/// with the corrected-RA extremes taken at the band's clipped edges, so
/// that slant never hides a neighbour. Right ascension wraps at the 0h
/// seam of each band, the diagonal bucket of a corner is included, and the
/// box is clipped at ±90°.
pub fn margin_targets(ra_rad: f64, dec_rad: f64, margin_deg: f64) -> MarginTargets {
    let home = BucketKey::for_position(ra_rad, dec_rad);
    let mut targets = MarginTargets::default();

    let dec_deg = dec_rad.to_degrees();
    let mut south = dec_deg - margin_deg;
    let mut north = dec_deg + margin_deg;
    if south < -90.0 {
        targets.pole_clamped = true;
        south = -90.0;
    }
    if north > 90.0 {
        targets.pole_clamped = true;
        north = 90.0;
    }

    let segments = ra_segments(normalize_ra(ra_rad).to_degrees(), dec_rad, margin_deg);

    let first_band = libm::floor(south) as i32;
    let last_band = libm::ceil(north) as i32 - 1;
    for band in first_band..=last_band {
        let low = south.max(band as f64).to_radians();
        let high = north.min((band + 1) as f64).to_radians();
        let (cos_a, cos_b) = (libm::cos(low).max(0.0), libm::cos(high).max(0.0));
        let (cos_min, cos_max) = (cos_a.min(cos_b), cos_a.max(cos_b));

        for &(west, east) in &segments {
            let first = libm::floor(west * cos_min) as i32;
            let last = libm::ceil(east * cos_max) as i32 - 1;
            for ra in first..=last {
                let key = BucketKey {
                    ra,
                    dec: band + DEC_OFFSET,
                };
                if key != home && !targets.keys.contains(&key) {
                    targets.keys.push(key);
                }
            }
        }
    }

    targets
}

/// True-RA intervals in degrees covered by the margin box, split at the seam.
fn ra_segments(ra_deg: f64, dec_rad: f64, margin_deg: f64) -> Vec<(f64, f64)> {
    let cos = libm::cos(dec_rad);
    if cos <= 0.0 || margin_deg / cos >= 180.0 {
        return vec![(0.0, 360.0)];
    }
    let shift = margin_deg / cos;
    let (west, east) = (ra_deg - shift, ra_deg + shift);
    if west < 0.0 {
        vec![(west + 360.0, 360.0), (0.0, east)]
    } else if east > 360.0 {
        vec![(west, 360.0), (0.0, east - 360.0)]
    } else {
        vec![(west, east)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ra_bucket_count;

    const MARGIN: f64 = 30.0 / 3600.0;

    fn rad(deg: f64) -> f64 {
        deg.to_radians()
    }

    #[test]
    fn test_home_bucket_equator() {
        let key = BucketKey::for_position(rad(10.5), rad(0.5));
        assert_eq!(key, BucketKey { ra: 10, dec: 89 });
        assert_eq!(key.dec_floor_deg(), 0);
    }

    #[test]
    fn test_home_bucket_uses_floor_below_equator() {
        let key = BucketKey::for_position(rad(10.5), rad(-0.5));
        assert_eq!(key, BucketKey { ra: 10, dec: 88 });
    }

    #[test]
    fn test_home_bucket_compressed_ra() {
        let key = BucketKey::for_position(rad(100.4), rad(60.5));
        let expected_ra = (100.4 * libm::cos(rad(60.5))).floor() as i32;
        assert_eq!(key.ra, expected_ra);
        assert_eq!(key.dec, 60 + DEC_OFFSET);
    }

    #[test]
    fn test_display_matches_file_stem() {
        assert_eq!(BucketKey { ra: 12, dec: -1 }.to_string(), "f12_s-1");
    }

    #[test]
    fn test_interior_star_stays_home() {
        let targets = margin_targets(rad(10.5), rad(0.5), MARGIN);
        assert!(targets.keys.is_empty());
        assert!(!targets.pole_clamped);
    }

    #[test]
    fn test_west_border() {
        let targets = margin_targets(rad(10.0 + 0.002), rad(0.5), MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 9, dec: 89 }]);
    }

    #[test]
    fn test_east_border() {
        let targets = margin_targets(rad(10.998), rad(0.5), MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 11, dec: 89 }]);
    }

    #[test]
    fn test_south_and_north_borders() {
        let south = margin_targets(rad(10.5), rad(3.002), MARGIN);
        let home = BucketKey::for_position(rad(10.5), rad(3.002));
        assert_eq!(south.keys.len(), 1);
        assert_eq!(south.keys[0].dec, home.dec - 1);

        let north = margin_targets(rad(10.5), rad(3.998), MARGIN);
        assert_eq!(north.keys.len(), 1);
        assert_eq!(north.keys[0].dec, home.dec + 1);
    }

    #[test]
    fn test_corner_adds_diagonal() {
        let dec = rad(0.999);
        let ra = rad(10.001 / libm::cos(dec));
        assert_eq!(BucketKey::for_position(ra, dec), BucketKey { ra: 10, dec: 89 });
        let targets = margin_targets(ra, dec, MARGIN);
        assert_eq!(
            targets.keys,
            vec![
                BucketKey { ra: 9, dec: 89 },
                BucketKey { ra: 9, dec: 90 },
                BucketKey { ra: 10, dec: 90 },
            ]
        );
    }

    #[test]
    fn test_west_wraps_to_end_of_band() {
        let targets = margin_targets(rad(0.001), rad(0.5), MARGIN);
        let last = ra_bucket_count(rad(0.5)) - 1;
        assert_eq!(targets.keys, vec![BucketKey { ra: last, dec: 89 }]);
    }

    #[test]
    fn test_east_wraps_to_start_of_band() {
        let dec = rad(0.5);
        let width = 360.0 * libm::cos(dec);
        // Within one margin of the seam, but nowhere near a whole corrected degree.
        let ra_deg = (width - 0.001) / libm::cos(dec);
        let frac = (width - 0.001) - (width - 0.001).floor();
        assert!(frac > MARGIN && frac < 1.0 - MARGIN);
        let targets = margin_targets(rad(ra_deg), dec, MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 0, dec: 89 }]);
    }

    #[test]
    fn test_exact_margin_is_not_replicated() {
        let ra = rad(10.5);

        // Margin equal to the distance to the 2° line, both exact in f64.
        let dec = rad(2.015625);
        let margin = dec.to_degrees() - 2.0;
        assert!((margin - 1.0 / 64.0).abs() < 1e-12);
        assert!(margin_targets(ra, dec, margin).keys.is_empty());
        assert_eq!(margin_targets(ra, dec, margin * 1.001).keys.len(), 1);

        // Same at the northern edge of the band.
        let dec = rad(2.984375);
        let margin = 3.0 - dec.to_degrees();
        assert!(margin_targets(ra, dec, margin).keys.is_empty());
        assert_eq!(margin_targets(ra, dec, margin * 1.001).keys.len(), 1);
    }

    #[test]
    fn test_north_pole_clamp() {
        let targets = margin_targets(rad(123.0), rad(89.9999), MARGIN);
        assert!(targets.pole_clamped);
        assert!(targets.keys.is_empty());
    }

    #[test]
    fn test_south_pole_clamp() {
        let targets = margin_targets(rad(45.0), rad(-89.9999), MARGIN);
        assert!(targets.pole_clamped);
        assert!(targets.keys.is_empty());
    }

    #[test]
    fn test_high_declination_west_neighbour() {
        let dec = rad(85.5);
        let ra = rad(20.001 / libm::cos(dec));
        assert_eq!(BucketKey::for_position(ra, dec), BucketKey { ra: 20, dec: 174 });
        let targets = margin_targets(ra, dec, MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 19, dec: 174 }]);
        assert!(!targets.pole_clamped);
    }

    #[test]
    fn test_high_declination_east_neighbour() {
        let dec = rad(85.5);
        let ra = rad(20.999 / libm::cos(dec));
        assert_eq!(BucketKey::for_position(ra, dec), BucketKey { ra: 20, dec: 174 });
        let targets = margin_targets(ra, dec, MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 21, dec: 174 }]);
    }

    #[test]
    fn test_high_declination_seam_wraps_to_first_bucket() {
        let dec = rad(85.5);
        let width = 360.0 * libm::cos(dec);
        let last = ra_bucket_count(dec) - 1;
        assert_eq!(last, 28);
        // Inside the partial last bucket, well clear of any whole corrected degree.
        let ra = rad((width - 0.001) / libm::cos(dec));
        assert_eq!(BucketKey::for_position(ra, dec), BucketKey { ra: last, dec: 174 });
        let targets = margin_targets(ra, dec, MARGIN);
        assert_eq!(targets.keys, vec![BucketKey { ra: 0, dec: 174 }]);
    }

    #[test]
    fn test_declination_border_covers_slanted_grid() {
        // Just above +60° at RA ≈ 200°, the 100° corrected line moves by
        // about twice the margin between the star and the band below.
        let dec = rad(60.0 + 10.0 / 3600.0 - 0.0005);
        let ra = rad(99.99 / libm::cos(rad(59.9995)));
        assert_eq!(BucketKey::for_position(ra, dec), BucketKey { ra: 99, dec: 149 });
        let targets = margin_targets(ra, dec, MARGIN);
        assert_eq!(
            targets.keys,
            vec![BucketKey { ra: 99, dec: 148 }, BucketKey { ra: 100, dec: 148 }]
        );
    }
}
