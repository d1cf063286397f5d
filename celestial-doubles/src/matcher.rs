//! Stage two: find common-proper-motion pairs missing from the reference catalog.
//!
//! Every candidate bright enough to be a primary scans its own bucket
//! (margin copies included) for secondaries. A secondary survives only if
//! it passes each check of [`screen_pair`] in order; surviving pairs whose
//! search box holds no known pair are reported.
//!
//! Pairs are not deduplicated: when both stars qualify as primaries the
//! pair is reported once from each side.

use std::fmt;

use serde::Serialize;

use crate::config::MatchConfig;
use crate::coords::{arcsec_to_rad, flat_separation_arcsec};
use crate::error::Result;
use crate::reference::{ReferenceIndex, SkyBox};
use crate::region::{BucketReader, BucketStore};
use crate::star::{CatalogId, MagSource, StarRecord};

/// One side of a reported pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairMember {
    pub id: CatalogId,
    pub mag: i32,
    pub mag_source: MagSource,
    pub pm_ra: i32,
    pub pm_dec: i32,
}

impl From<&StarRecord> for PairMember {
    fn from(star: &StarRecord) -> Self {
        Self {
            id: star.id,
            mag: star.mag,
            mag_source: star.mag_source,
            pm_ra: star.pm_ra,
            pm_dec: star.pm_dec,
        }
    }
}

/// A candidate double star with no counterpart in the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlistedPair {
    /// Primary position, radians.
    pub ra: f64,
    pub dec: f64,
    pub primary: PairMember,
    pub secondary: PairMember,
    pub separation_arcsec: f64,
    /// The primary's double-star flag from the source catalog.
    pub double_flag: u8,
}

/// Why a secondary was not paired with a primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SecondaryTooFaint,
    OutsideBox,
    SameStar,
    NotFainter,
    MagnitudeGap,
    NoMotion,
    Separation,
    SlowMotion,
    DivergentMotion,
}

/// Apply the pair filters in order, returning the separation in arcseconds.
///
/// The order is fixed: cheap identity and photometry checks run before any
/// separation or proper-motion arithmetic.
pub fn screen_pair(
    config: &MatchConfig,
    primary: &StarRecord,
    secondary: &StarRecord,
) -> std::result::Result<f64, Rejection> {
    if secondary.mag > config.secondary_mag {
        return Err(Rejection::SecondaryTooFaint);
    }
    let search = SkyBox::around(primary.ra, primary.dec, arcsec_to_rad(config.box_half_width_arcsec));
    if !search.contains(secondary.ra, secondary.dec) {
        return Err(Rejection::OutsideBox);
    }
    if primary.is_same_star(secondary) {
        return Err(Rejection::SameStar);
    }
    if secondary.mag <= primary.mag {
        return Err(Rejection::NotFainter);
    }
    if (secondary.mag - primary.mag).abs() > config.max_mag_diff {
        return Err(Rejection::MagnitudeGap);
    }
    if !secondary.has_proper_motion() {
        return Err(Rejection::NoMotion);
    }

    let sep = flat_separation_arcsec(primary.ra, primary.dec, secondary.ra, secondary.dec);
    if sep < config.min_sep_arcsec || sep > config.max_sep_arcsec {
        return Err(Rejection::Separation);
    }

    let mean = motion_magnitude(
        (primary.pm_ra as f64 + secondary.pm_ra as f64) / 2.0,
        (primary.pm_dec as f64 + secondary.pm_dec as f64) / 2.0,
    );
    if mean < config.min_pm {
        return Err(Rejection::SlowMotion);
    }
    if motion_ratio(primary, secondary) <= config.min_pm_ratio {
        return Err(Rejection::DivergentMotion);
    }
    Ok(sep)
}

fn motion_magnitude(ra: f64, dec: f64) -> f64 {
    libm::hypot(ra, dec)
}

/// Mean proper motion over half the motion difference.
///
/// Identical motions give infinity, the strongest possible agreement.
pub fn motion_ratio(a: &StarRecord, b: &StarRecord) -> f64 {
    let mean = motion_magnitude(
        (a.pm_ra as f64 + b.pm_ra as f64) / 2.0,
        (a.pm_dec as f64 + b.pm_dec as f64) / 2.0,
    );
    let half_diff = motion_magnitude(
        (a.pm_ra as f64 - b.pm_ra as f64) / 2.0,
        (a.pm_dec as f64 - b.pm_dec as f64) / 2.0,
    );
    if half_diff == 0.0 {
        f64::INFINITY
    } else {
        mean / half_diff
    }
}

/// Counters for one matching run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub candidates: u64,
    /// Candidates fainter than the primary threshold.
    pub skipped_primaries: u64,
    pub bucket_opens: u64,
    pub bucket_rewinds: u64,
    pub stars_scanned: u64,
    pub secondary_too_faint: u64,
    pub outside_box: u64,
    pub same_star: u64,
    pub not_fainter: u64,
    pub magnitude_gap: u64,
    pub no_motion: u64,
    pub separation: u64,
    pub slow_motion: u64,
    pub divergent_motion: u64,
    /// Pairs that passed every filter but are already catalogued.
    pub listed: u64,
    pub emitted: u64,
    /// The result cap was reached and scanning stopped early.
    pub capped: bool,
}

impl MatchStats {
    fn record(&mut self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::SecondaryTooFaint => &mut self.secondary_too_faint,
            Rejection::OutsideBox => &mut self.outside_box,
            Rejection::SameStar => &mut self.same_star,
            Rejection::NotFainter => &mut self.not_fainter,
            Rejection::MagnitudeGap => &mut self.magnitude_gap,
            Rejection::NoMotion => &mut self.no_motion,
            Rejection::Separation => &mut self.separation,
            Rejection::SlowMotion => &mut self.slow_motion,
            Rejection::DivergentMotion => &mut self.divergent_motion,
        };
        *counter += 1;
    }
}

impl fmt::Display for MatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candidates read: {}", self.candidates)?;
        writeln!(f, "Skipped (primary too faint): {}", self.skipped_primaries)?;
        writeln!(f, "Bucket opens / rewinds: {} / {}", self.bucket_opens, self.bucket_rewinds)?;
        writeln!(f, "Stars scanned: {}", self.stars_scanned)?;
        writeln!(f, "Rejected, secondary too faint: {}", self.secondary_too_faint)?;
        writeln!(f, "Rejected, outside box: {}", self.outside_box)?;
        writeln!(f, "Rejected, same star: {}", self.same_star)?;
        writeln!(f, "Rejected, not fainter: {}", self.not_fainter)?;
        writeln!(f, "Rejected, magnitude gap: {}", self.magnitude_gap)?;
        writeln!(f, "Rejected, no proper motion: {}", self.no_motion)?;
        writeln!(f, "Rejected, separation: {}", self.separation)?;
        writeln!(f, "Rejected, slow motion: {}", self.slow_motion)?;
        writeln!(f, "Rejected, divergent motion: {}", self.divergent_motion)?;
        writeln!(f, "Already listed: {}", self.listed)?;
        write!(
            f,
            "Emitted: {}{}",
            self.emitted,
            if self.capped { " (result cap reached)" } else { "" }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub pairs: Vec<UnlistedPair>,
    pub stats: MatchStats,
}

/// Run the matcher over a partitioned store.
///
/// Consecutive candidates from the same bucket reuse the open reader and
/// rewind it; a new bucket closes the previous one. Stops early, without
/// error, once `max_results` pairs have been found.
pub fn find_unlisted_pairs(
    store: &BucketStore,
    reference: &ReferenceIndex,
    config: &MatchConfig,
) -> Result<MatchOutcome> {
    config.validate()?;
    let half_width = arcsec_to_rad(config.box_half_width_arcsec);
    let mut outcome = MatchOutcome::default();
    let stats = &mut outcome.stats;
    let mut bucket: Option<BucketReader> = None;

    'candidates: for candidate in store.open_candidates()? {
        let candidate = candidate?;
        stats.candidates += 1;
        let primary = candidate.star;
        if primary.mag > config.primary_mag {
            stats.skipped_primaries += 1;
            continue;
        }

        let reader = match bucket.take() {
            Some(mut open) if open.key() == candidate.bucket => {
                open.rewind()?;
                stats.bucket_rewinds += 1;
                open
            }
            _ => {
                stats.bucket_opens += 1;
                log::debug!("Scanning bucket {}", candidate.bucket);
                store.open_bucket(candidate.bucket)?
            }
        };
        let reader = bucket.insert(reader);

        while let Some(secondary) = reader.next_star()? {
            stats.stars_scanned += 1;
            let separation_arcsec = match screen_pair(config, &primary, &secondary) {
                Ok(sep) => sep,
                Err(rejection) => {
                    stats.record(rejection);
                    continue;
                }
            };

            if reference.has_pair_within(&SkyBox::around(primary.ra, primary.dec, half_width)) {
                stats.listed += 1;
                continue;
            }

            if outcome.pairs.len() >= config.max_results {
                stats.capped = true;
                log::warn!("Result cap of {} reached; stopping early", config.max_results);
                break 'candidates;
            }
            outcome.pairs.push(UnlistedPair {
                ra: primary.ra,
                dec: primary.dec,
                primary: PairMember::from(&primary),
                secondary: PairMember::from(&secondary),
                separation_arcsec,
                double_flag: primary.double_flag,
            });
            stats.emitted += 1;
        }
    }

    log::info!(
        "Matched {} candidates: {} unlisted pairs, {} already listed",
        outcome.stats.candidates,
        outcome.stats.emitted,
        outcome.stats.listed
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::arcsec_to_rad;

    fn star(seq: u32, mag: i32, pm: (i32, i32)) -> StarRecord {
        StarRecord {
            ra: 1.0,
            dec: 0.3,
            mag,
            mag_source: MagSource::Survey,
            pm_ra: pm.0,
            pm_dec: pm.1,
            double_flag: 0,
            id: CatalogId { zone: 300, seq },
        }
    }

    fn offset(mut s: StarRecord, east_arcsec: f64, north_arcsec: f64) -> StarRecord {
        s.ra += arcsec_to_rad(east_arcsec);
        s.dec += arcsec_to_rad(north_arcsec);
        s
    }

    #[test]
    fn test_accepts_common_motion_pair() {
        let config = MatchConfig::default();
        let primary = star(1, 10_000, (20, 20));
        let secondary = offset(star(2, 10_500, (22, 19)), 10.0, 0.0);
        let sep = screen_pair(&config, &primary, &secondary).unwrap();
        assert!((sep - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejection_order() {
        let config = MatchConfig::default();
        let primary = star(1, 10_000, (20, 20));

        let faint = offset(star(2, 13_001, (20, 20)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &faint), Err(Rejection::SecondaryTooFaint));

        let far = offset(star(2, 10_500, (20, 20)), 31.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &far), Err(Rejection::OutsideBox));

        assert_eq!(screen_pair(&config, &primary, &primary), Err(Rejection::SameStar));

        let brighter = offset(star(2, 9_000, (20, 20)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &brighter), Err(Rejection::NotFainter));

        let equal = offset(star(2, 10_000, (20, 20)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &equal), Err(Rejection::NotFainter));

        let still = offset(star(2, 10_500, (0, 0)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &still), Err(Rejection::NoMotion));

        let close = offset(star(2, 10_500, (20, 20)), 1.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &close), Err(Rejection::Separation));

        let slow_primary = star(1, 10_000, (1, 1));
        let slow = offset(star(2, 10_500, (2, 1)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &slow_primary, &slow), Err(Rejection::SlowMotion));

        let divergent = offset(star(2, 10_500, (-10, 40)), 5.0, 0.0);
        assert_eq!(screen_pair(&config, &primary, &divergent), Err(Rejection::DivergentMotion));
    }

    #[test]
    fn test_magnitude_gap_is_absolute() {
        let config = MatchConfig {
            secondary_mag: 20_000,
            ..MatchConfig::default()
        };
        let primary = star(1, 8_000, (20, 20));
        for gap in [4_001, 4_500, 9_000] {
            let secondary = offset(star(2, 8_000 + gap, (20, 20)), 5.0, 0.0);
            assert_eq!(screen_pair(&config, &primary, &secondary), Err(Rejection::MagnitudeGap));
        }
        let secondary = offset(star(2, 12_000, (20, 20)), 5.0, 0.0);
        assert!(screen_pair(&config, &primary, &secondary).is_ok());
    }

    #[test]
    fn test_ratio_threshold() {
        let config = MatchConfig::default();
        let primary = star(1, 10_000, (20, 0));
        // Motions (20,0) and (12,0): mean 16, half difference 4, ratio 4.
        let secondary = offset(star(2, 10_500, (12, 0)), 5.0, 0.0);
        assert!((motion_ratio(&primary, &secondary) - 4.0).abs() < 1e-12);
        assert!(screen_pair(&config, &primary, &secondary).is_ok());

        let strict = MatchConfig {
            min_pm_ratio: 4.0,
            ..MatchConfig::default()
        };
        assert_eq!(screen_pair(&strict, &primary, &secondary), Err(Rejection::DivergentMotion));
    }

    #[test]
    fn test_identical_motion_ratio_is_infinite() {
        let a = star(1, 10_000, (7, -3));
        assert!(motion_ratio(&a, &a).is_infinite());
    }

    #[test]
    fn test_divergent_motion_never_passes() {
        let config = MatchConfig::default();
        let primary = star(1, 10_000, (30, 10));
        for pm in [(-30, -10), (0, 40), (60, -30), (-5, 5)] {
            let secondary = offset(star(2, 10_500, pm), 8.0, 3.0);
            if screen_pair(&config, &primary, &secondary).is_ok() {
                let half_diff = libm::hypot(
                    (primary.pm_ra - secondary.pm_ra) as f64 / 2.0,
                    (primary.pm_dec - secondary.pm_dec) as f64 / 2.0,
                );
                let mean = libm::hypot(
                    (primary.pm_ra + secondary.pm_ra) as f64 / 2.0,
                    (primary.pm_dec + secondary.pm_dec) as f64 / 2.0,
                );
                assert!(half_diff < mean / config.min_pm_ratio, "{:?} passed", pm);
            }
        }
    }

    #[test]
    fn test_stats_display_mentions_cap() {
        let stats = MatchStats {
            emitted: 3,
            capped: true,
            ..MatchStats::default()
        };
        assert!(stats.to_string().contains("Emitted: 3 (result cap reached)"));
    }
}
