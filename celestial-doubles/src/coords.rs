//! Angle conversions between raw catalog units, radians, and bucket space.
//!
//! Raw catalog positions arrive as milliarcseconds: right ascension from
//! 0h, declination as south polar distance. Everything downstream works in
//! radians. Bucket assignment uses a *declination-corrected* right
//! ascension, `ra° × cos(δ)`, which keeps the angular width of a one-degree
//! bucket roughly constant as meridians converge toward the poles.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Milliarcseconds in one degree.
pub const MAS_PER_DEGREE: f64 = 3_600_000.0;

/// Arcseconds in one degree.
pub const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// Convert raw right ascension (mas from 0h) to radians in `[0, 2π)`.
pub fn ra_mas_to_rad(ra_mas: u32) -> f64 {
    (ra_mas as f64 / MAS_PER_DEGREE).to_radians()
}

/// Convert raw south polar distance (mas) to declination in radians.
pub fn spd_mas_to_dec_rad(spd_mas: u32) -> f64 {
    (spd_mas as f64 / MAS_PER_DEGREE - 90.0).to_radians()
}

/// Inverse of [`ra_mas_to_rad`], rounded to the nearest milliarcsecond.
pub fn ra_rad_to_mas(ra_rad: f64) -> u32 {
    (ra_rad.to_degrees() * MAS_PER_DEGREE).round() as u32
}

/// Inverse of [`spd_mas_to_dec_rad`], rounded to the nearest milliarcsecond.
pub fn dec_rad_to_spd_mas(dec_rad: f64) -> u32 {
    ((dec_rad.to_degrees() + 90.0) * MAS_PER_DEGREE).round() as u32
}

/// Right ascension in degrees scaled by `cos(δ)`.
///
/// Only meaningful for bucket assignment and margin tests. Near the poles
/// the cosine collapses toward zero, so every star lands in RA bucket 0;
/// the cosine is clamped at zero so rounding never produces a negative
/// coordinate.
pub fn corrected_ra_deg(ra_rad: f64, dec_rad: f64) -> f64 {
    ra_rad.to_degrees() * libm::cos(dec_rad).max(0.0)
}

/// Number of corrected-RA buckets spanning a full circle at `dec_rad`.
///
/// Always at least one, so the pole caps still form a single bucket.
pub fn ra_bucket_count(dec_rad: f64) -> i32 {
    let width = 360.0 * libm::cos(dec_rad).max(0.0);
    (libm::ceil(width - 1e-9) as i32).max(1)
}

/// Wrap a right ascension into `[0, 2π)`.
pub fn normalize_ra(ra_rad: f64) -> f64 {
    let wrapped = ra_rad.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Whether a declination lies on the sphere.
pub fn is_valid_dec(dec_rad: f64) -> bool {
    (-FRAC_PI_2..=FRAC_PI_2).contains(&dec_rad)
}

pub fn arcsec_to_rad(arcsec: f64) -> f64 {
    (arcsec / ARCSEC_PER_DEGREE).to_radians()
}

pub fn rad_to_arcsec(rad: f64) -> f64 {
    rad.to_degrees() * ARCSEC_PER_DEGREE
}

/// Signed right-ascension difference `ra1 - ra2`, wrapped into `(-π, π]`.
pub fn ra_difference(ra1: f64, ra2: f64) -> f64 {
    let d = (ra1 - ra2).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Small-angle separation in arcseconds.
///
/// Plain Euclidean distance in (ra, dec) radian space with no `cos(δ)`
/// factor. Overestimates east-west separations away from the equator.
/// The RA difference is taken across the 0h seam when that is shorter.
pub fn flat_separation_arcsec(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let dr = ra_difference(ra1, ra2);
    let dd = dec1 - dec2;
    libm::sqrt(dr * dr + dd * dd) * 180.0 * ARCSEC_PER_DEGREE / PI
}

/// Format a right ascension as `hh:mm:ss.ss`.
pub fn format_ra_hms(ra_rad: f64) -> String {
    const CENTISECONDS_PER_DAY: i64 = 24 * 3600 * 100;
    let hours = normalize_ra(ra_rad) * 12.0 / PI;
    let total = ((hours * 360_000.0).round() as i64).rem_euclid(CENTISECONDS_PER_DAY);
    let h = total / 360_000;
    let m = (total / 6000) % 60;
    let s = (total / 100) % 60;
    let cs = total % 100;
    format!("{:02}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// Format a declination as `±dd:mm:ss.s`.
pub fn format_dec_dms(dec_rad: f64) -> String {
    let sign = if dec_rad < 0.0 { '-' } else { '+' };
    let total = (dec_rad.abs().to_degrees() * 36_000.0).round() as i64;
    let d = total / 36_000;
    let m = (total / 600) % 60;
    let s = (total / 10) % 60;
    let ds = total % 10;
    format!("{}{:02}:{:02}:{:02}.{}", sign, d, m, s, ds)
}

/// Parse a WDS precise-coordinate field, `hhmmss.ss±ddmmss.s`, to radians.
///
/// Returns `None` for blank, short, or out-of-range fields.
pub fn parse_wds_precise(field: &str) -> Option<(f64, f64)> {
    let field = field.get(..18)?;
    let num = |range: std::ops::Range<usize>| -> Option<f64> {
        let text = field.get(range)?;
        if text.bytes().any(|b| !(b.is_ascii_digit() || b == b'.')) {
            return None;
        }
        text.parse().ok()
    };

    let (h, m, s) = (num(0..2)?, num(2..4)?, num(4..9)?);
    let sign = match field.as_bytes()[9] {
        b'+' => 1.0,
        b'-' => -1.0,
        _ => return None,
    };
    let (d, dm, ds) = (num(10..12)?, num(12..14)?, num(14..18)?);
    if h >= 24.0 || m >= 60.0 || s >= 60.0 || d > 90.0 || dm >= 60.0 || ds >= 60.0 {
        return None;
    }

    let ra = (h + m / 60.0 + s / 3600.0) * PI / 12.0;
    let dec = sign * (d + dm / 60.0 + ds / 3600.0).to_radians();
    if !is_valid_dec(dec) {
        return None;
    }
    Some((ra, dec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ra_round_trip() {
        for mas in [0u32, 1, 3_600_000, 648_000_000, 1_295_999_999] {
            assert_eq!(ra_rad_to_mas(ra_mas_to_rad(mas)), mas);
        }
    }

    #[test]
    fn test_dec_round_trip() {
        for spd in [0u32, 1, 3_600_000, 324_000_000, 647_999_999, 648_000_000] {
            assert_eq!(dec_rad_to_spd_mas(spd_mas_to_dec_rad(spd)), spd);
        }
    }

    #[test]
    fn test_spd_origin_is_south_pole() {
        assert!((spd_mas_to_dec_rad(0) + FRAC_PI_2).abs() < 1e-15);
        assert!(spd_mas_to_dec_rad(90 * 3_600_000).abs() < 1e-15);
        assert!((spd_mas_to_dec_rad(180 * 3_600_000) - FRAC_PI_2).abs() < 1e-15);
    }

    #[test]
    fn test_corrected_ra_equator_unchanged() {
        let ra = 123.25_f64.to_radians();
        assert!((corrected_ra_deg(ra, 0.0) - 123.25).abs() < 1e-10);
    }

    #[test]
    fn test_corrected_ra_compressed_at_sixty() {
        let ra = 100.0_f64.to_radians();
        let dec = 60.0_f64.to_radians();
        assert!((corrected_ra_deg(ra, dec) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_corrected_ra_stable_at_poles() {
        let ra = 359.0_f64.to_radians();
        for dec in [FRAC_PI_2, -FRAC_PI_2] {
            let c = corrected_ra_deg(ra, dec);
            assert!(c.is_finite());
            assert!((0.0..1e-12).contains(&c), "corrected RA {}", c);
        }
    }

    #[test]
    fn test_ra_bucket_count() {
        assert_eq!(ra_bucket_count(0.0), 360);
        assert_eq!(ra_bucket_count(60.0_f64.to_radians()), 180);
        assert_eq!(ra_bucket_count(FRAC_PI_2), 1);
    }

    #[test]
    fn test_normalize_ra() {
        assert!((normalize_ra(-0.1) - (TAU - 0.1)).abs() < 1e-12);
        assert!((normalize_ra(TAU + 0.25) - 0.25).abs() < 1e-12);
        assert_eq!(normalize_ra(0.0), 0.0);
    }

    #[test]
    fn test_flat_separation() {
        let ten_arcsec = arcsec_to_rad(10.0);
        let sep = flat_separation_arcsec(1.0, 0.2, 1.0 + ten_arcsec, 0.2);
        assert!((sep - 10.0).abs() < 1e-9);

        let sep = flat_separation_arcsec(1.0, 0.2, 1.0 + arcsec_to_rad(3.0), 0.2 + arcsec_to_rad(4.0));
        assert!((sep - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_separation_across_seam() {
        let sep = flat_separation_arcsec(arcsec_to_rad(3.0), 0.0, TAU - arcsec_to_rad(4.0), 0.0);
        assert!((sep - 7.0).abs() < 1e-6, "separation {}", sep);
        assert!((ra_difference(0.1, TAU - 0.1) - 0.2).abs() < 1e-12);
        assert!((ra_difference(TAU - 0.1, 0.1) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_parse_wds_precise() {
        let (ra, dec) = parse_wds_precise("000001.23+453015.6").unwrap();
        assert!((ra - (1.23 / 3600.0) * PI / 12.0).abs() < 1e-12);
        let expected = (45.0 + 30.0 / 60.0 + 15.6 / 3600.0_f64).to_radians();
        assert!((dec - expected).abs() < 1e-12);

        let (_, dec) = parse_wds_precise("123456.78-000000.5").unwrap();
        assert!(dec < 0.0);
    }

    #[test]
    fn test_parse_wds_precise_rejects_junk() {
        assert!(parse_wds_precise("").is_none());
        assert!(parse_wds_precise("                  ").is_none());
        assert!(parse_wds_precise("000001.23 453015.6").is_none());
        assert!(parse_wds_precise("250001.23+453015.6").is_none());
        assert!(parse_wds_precise("000001.23+953015.6").is_none());
        assert!(parse_wds_precise("0000 1.23+453015.6").is_none());
    }

    #[test]
    fn test_format_ra_hms() {
        assert_eq!(format_ra_hms(PI), "12:00:00.00");
        let ra = (1.0 + 2.0 / 60.0 + 3.45 / 3600.0) * PI / 12.0;
        assert_eq!(format_ra_hms(ra), "01:02:03.45");
        assert_eq!(format_ra_hms(TAU - 1e-12), "00:00:00.00");
    }

    #[test]
    fn test_format_dec_dms() {
        assert_eq!(format_dec_dms(-PI / 4.0), "-45:00:00.0");
        let dec = (5.0 + 6.0 / 60.0 + 7.8 / 3600.0_f64).to_radians();
        assert_eq!(format_dec_dms(dec), "+05:06:07.8");
        assert_eq!(format_dec_dms(0.0), "+00:00:00.0");
    }
}
