//! Stage one: stream catalog stars into buckets and the candidate list.

use std::fmt;

use serde::Serialize;

use super::store::{BucketStore, BucketWriter, CandidateWriter};
use super::{margin_targets, BucketKey};
use crate::config::PartitionConfig;
use crate::coords::{is_valid_dec, ARCSEC_PER_DEGREE};
use crate::error::Result;
use crate::star::{CandidateRecord, StarRecord};

/// Counters accumulated over one partitioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    /// Stars offered to the partitioner.
    pub seen: u64,
    /// Stars fainter than the save threshold.
    pub too_faint: u64,
    /// Stars with a declination off the sphere.
    pub rejected: u64,
    /// Stars written to their home bucket.
    pub saved: u64,
    /// Stars also written to the candidate list.
    pub candidates: u64,
    /// Extra records written into neighbouring buckets.
    pub margin_copies: u64,
    /// Declination replications dropped at a pole.
    pub pole_clamped: u64,
    /// Home-bucket file opens; low relative to `saved` when input is clustered.
    pub bucket_opens: u64,
}

impl fmt::Display for PartitionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stars scanned: {}", self.seen)?;
        writeln!(f, "Too faint: {}", self.too_faint)?;
        writeln!(f, "Rejected (bad declination): {}", self.rejected)?;
        writeln!(f, "Saved: {}", self.saved)?;
        writeln!(f, "Candidates: {}", self.candidates)?;
        writeln!(f, "Margin copies: {}", self.margin_copies)?;
        writeln!(f, "Pole-clamped replications: {}", self.pole_clamped)?;
        write!(f, "Bucket opens: {}", self.bucket_opens)
    }
}

/// Owns the bucket writer and candidate list for a single run.
///
/// Stars are binned as they arrive; nothing is buffered beyond the one
/// open bucket file, so input order only affects how often files reopen.
pub struct Partitioner {
    store: BucketStore,
    writer: BucketWriter,
    candidates: CandidateWriter,
    candidate_mag: i32,
    save_mag: i32,
    margin_deg: f64,
    stats: PartitionStats,
}

impl Partitioner {
    pub fn new(store: BucketStore, config: &PartitionConfig) -> Result<Self> {
        config.validate()?;
        let candidates = store.create_candidates()?;
        Ok(Self {
            writer: BucketWriter::new(store.clone()),
            store,
            candidates,
            candidate_mag: config.candidate_mag,
            save_mag: config.save_mag,
            margin_deg: config.margin_arcsec / ARCSEC_PER_DEGREE,
            stats: PartitionStats::default(),
        })
    }

    pub fn add_star(&mut self, star: &StarRecord) -> Result<()> {
        self.stats.seen += 1;

        if !is_valid_dec(star.dec) {
            log::debug!("Rejecting {}: declination {} rad off the sphere", star.id, star.dec);
            self.stats.rejected += 1;
            return Ok(());
        }
        if star.mag > self.save_mag {
            self.stats.too_faint += 1;
            return Ok(());
        }

        let home = BucketKey::for_position(star.ra, star.dec);
        self.writer.append(home, star)?;
        self.stats.saved += 1;

        if star.mag < self.candidate_mag {
            self.candidates.push(&CandidateRecord {
                star: *star,
                bucket: home,
            })?;
            self.stats.candidates += 1;
        }

        let targets = margin_targets(star.ra, star.dec, self.margin_deg);
        if targets.pole_clamped {
            self.stats.pole_clamped += 1;
        }
        for key in targets.keys {
            self.store.append(key, std::slice::from_ref(star))?;
            self.stats.margin_copies += 1;
        }
        Ok(())
    }

    pub fn stats(&self) -> &PartitionStats {
        &self.stats
    }

    /// Close the open bucket and finalise the candidate list.
    pub fn finish(self) -> Result<PartitionStats> {
        let Partitioner {
            writer,
            candidates,
            mut stats,
            ..
        } = self;
        stats.bucket_opens = writer.opens();
        writer.finish()?;
        let written = candidates.finish()?;
        log::info!(
            "Partitioned {} stars: {} saved, {} candidates, {} margin copies",
            stats.seen,
            stats.saved,
            written,
            stats.margin_copies
        );
        Ok(stats)
    }
}
