//! Index of known double stars, used to suppress already-catalogued pairs.
//!
//! Only pairs with a precise position are kept, sorted by right
//! ascension. A coarse table of 3600 tenth-degree slots maps each slot to
//! the first pair at or after the slot's lower edge (a binary-search lower
//! bound), so a box query starts its linear scan right before the first
//! pair that could match.

use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::coords::parse_wds_precise;
use crate::error::{DoublesError, Result};

/// Tenth-degree slots spanning the full circle.
pub const INDEX_SLOTS: usize = 3600;
const SLOT_WIDTH_DEG: f64 = 0.1;

/// Byte range of the precise-coordinate field in a full WDS summary line.
const WDS_PRECISE_COLUMNS: std::ops::Range<usize> = 112..130;
const PRECISE_FIELD_LEN: usize = 18;

/// Position of a known pair, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePair {
    pub ra: f64,
    pub dec: f64,
}

/// A right-ascension/declination box with strict (open) edges.
///
/// `west` may be negative and `east` may exceed 2π when the box straddles
/// the 0h seam; queries split such boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyBox {
    pub east: f64,
    pub north: f64,
    pub south: f64,
    pub west: f64,
}

impl SkyBox {
    /// Box of `half_width` radians on every side of a position.
    pub fn around(ra: f64, dec: f64, half_width: f64) -> Self {
        Self {
            east: ra + half_width,
            north: dec + half_width,
            south: dec - half_width,
            west: ra - half_width,
        }
    }

    /// Strict containment, honouring the 0h seam.
    pub fn contains(&self, ra: f64, dec: f64) -> bool {
        if !(dec > self.south && dec < self.north) {
            return false;
        }
        [ra, ra - TAU, ra + TAU]
            .iter()
            .any(|r| *r > self.west && *r < self.east)
    }

    /// The box's RA extent as at most two ranges inside `[0, 2π]`.
    fn ra_ranges(&self) -> Vec<(f64, f64)> {
        if self.west < 0.0 {
            vec![(self.west + TAU, TAU), (0.0, self.east)]
        } else if self.east > TAU {
            vec![(self.west, TAU), (0.0, self.east - TAU)]
        } else {
            vec![(self.west, self.east)]
        }
    }
}

/// What happened while loading the reference catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub lines: u64,
    pub loaded: u64,
    /// Lines with no usable precise position.
    pub skipped: u64,
    /// Input was not in RA order and had to be sorted.
    pub resorted: bool,
}

#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    pairs: Vec<ReferencePair>,
    slots: Vec<usize>,
    stats: LoadStats,
}

impl ReferenceIndex {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DoublesError::io(path, e))?;
        let index = Self::from_reader(BufReader::new(file), path)?;
        log::info!(
            "Loaded {} reference pairs from {:?} ({} lines skipped)",
            index.stats.loaded,
            path,
            index.stats.skipped
        );
        Ok(index)
    }

    /// Parse reference lines from any reader; `source` names it in errors and logs.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self> {
        let mut pairs = Vec::new();
        let mut lines = 0u64;
        let mut skipped = 0u64;
        for (n, line) in reader.split(b'\n').enumerate() {
            let line = line.map_err(|e| DoublesError::io(source, e))?;
            lines += 1;
            let text = String::from_utf8_lossy(&line);
            match parse_line(text.trim_end_matches('\r')) {
                Some(pair) => pairs.push(pair),
                None => {
                    log::debug!("{:?}:{}: no precise position, skipped", source, n + 1);
                    skipped += 1;
                }
            }
        }

        let mut index = Self::from_pairs(pairs);
        index.stats.lines = lines;
        index.stats.skipped = skipped;
        Ok(index)
    }

    /// Build the index from positions, sorting them if necessary.
    pub fn from_pairs(mut pairs: Vec<ReferencePair>) -> Self {
        let resorted = !pairs.windows(2).all(|w| w[0].ra <= w[1].ra);
        if resorted {
            log::warn!("Reference pairs are not in right-ascension order; sorting");
            pairs.sort_by(|a, b| a.ra.total_cmp(&b.ra));
        }

        let slots = (0..INDEX_SLOTS)
            .map(|k| {
                let edge = (k as f64 * SLOT_WIDTH_DEG).to_radians();
                pairs.partition_point(|p| p.ra < edge)
            })
            .collect();

        let stats = LoadStats {
            lines: pairs.len() as u64,
            loaded: pairs.len() as u64,
            skipped: 0,
            resorted,
        };
        Self {
            pairs,
            slots,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[ReferencePair] {
        &self.pairs
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Index of the first pair that could have RA greater than `ra`.
    fn scan_start(&self, ra: f64) -> usize {
        let slot = (ra.to_degrees() / SLOT_WIDTH_DEG).floor();
        let slot = if slot.is_nan() || slot < 0.0 {
            0
        } else {
            (slot as usize).min(INDEX_SLOTS - 1)
        };
        self.slots[slot]
    }

    /// Whether any known pair lies strictly inside the box.
    pub fn has_pair_within(&self, sky_box: &SkyBox) -> bool {
        sky_box.ra_ranges().into_iter().any(|(west, east)| {
            self.pairs[self.scan_start(west)..]
                .iter()
                .take_while(|p| p.ra < east)
                .any(|p| p.ra > west && p.dec > sky_box.south && p.dec < sky_box.north)
        })
    }
}

/// Extract a precise position from a bare field or a full WDS summary line.
fn parse_line(line: &str) -> Option<ReferencePair> {
    let field = if line.len() >= WDS_PRECISE_COLUMNS.end {
        line.get(WDS_PRECISE_COLUMNS)?
    } else {
        let trimmed = line.trim();
        if trimmed.len() != PRECISE_FIELD_LEN {
            return None;
        }
        trimmed
    };
    parse_wds_precise(field).map(|(ra, dec)| ReferencePair { ra, dec })
}
