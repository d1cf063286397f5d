//! Tunable thresholds for both stages.
//!
//! Magnitudes are in thousandths (12000 = 12.0 mag), angles in arcseconds,
//! proper motions in mas/yr. Every field has a default, so a JSON config
//! file only needs the values it changes:
//!
//! ```json
//! { "matching": { "max_sep_arcsec": 20.0, "min_pm": 10.0 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DoublesError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Stars strictly brighter than this become primary candidates.
    pub candidate_mag: i32,
    /// Stars fainter than this are not stored at all.
    pub save_mag: i32,
    /// Border distance below which a star is copied into the neighbour bucket.
    pub margin_arcsec: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            candidate_mag: 12_000,
            save_mag: 13_000,
            margin_arcsec: 30.0,
        }
    }
}

impl PartitionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.margin_arcsec > 0.0 && self.margin_arcsec < 1800.0) {
            return Err(DoublesError::InvalidConfig(format!(
                "margin_arcsec must lie in (0, 1800), got {}",
                self.margin_arcsec
            )));
        }
        if self.candidate_mag > self.save_mag {
            return Err(DoublesError::InvalidConfig(format!(
                "candidate_mag {} is fainter than save_mag {}",
                self.candidate_mag, self.save_mag
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidates fainter than this are not used as primaries.
    pub primary_mag: i32,
    /// Bucket stars fainter than this are not used as secondaries.
    pub secondary_mag: i32,
    /// Largest allowed magnitude difference, thousandths.
    pub max_mag_diff: i32,
    pub min_sep_arcsec: f64,
    pub max_sep_arcsec: f64,
    /// Half-width of the search box around each primary.
    pub box_half_width_arcsec: f64,
    /// Minimum magnitude of the pair's mean proper motion.
    pub min_pm: f64,
    /// Minimum ratio of mean motion to half the motion difference.
    pub min_pm_ratio: f64,
    /// Stop after emitting this many results.
    pub max_results: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            primary_mag: 12_000,
            secondary_mag: 13_000,
            max_mag_diff: 4_000,
            min_sep_arcsec: 2.0,
            max_sep_arcsec: 30.0,
            box_half_width_arcsec: 30.0,
            min_pm: 5.0,
            min_pm_ratio: 2.0,
            max_results: 65_536,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_sep_arcsec < 0.0 || self.min_sep_arcsec > self.max_sep_arcsec {
            return Err(DoublesError::InvalidConfig(format!(
                "separation window [{}, {}] is empty",
                self.min_sep_arcsec, self.max_sep_arcsec
            )));
        }
        if self.box_half_width_arcsec <= 0.0 {
            return Err(DoublesError::InvalidConfig(format!(
                "box_half_width_arcsec must be positive, got {}",
                self.box_half_width_arcsec
            )));
        }
        if self.max_mag_diff < 0 {
            return Err(DoublesError::InvalidConfig(format!(
                "max_mag_diff must not be negative, got {}",
                self.max_mag_diff
            )));
        }
        if self.min_pm < 0.0 || self.min_pm_ratio < 0.0 {
            return Err(DoublesError::InvalidConfig(
                "proper-motion thresholds must not be negative".to_string(),
            ));
        }
        if self.box_half_width_arcsec < self.max_sep_arcsec {
            log::warn!(
                "Search box half-width {}\" is below max separation {}\"; wider pairs will be missed",
                self.box_half_width_arcsec,
                self.max_sep_arcsec
            );
        }
        Ok(())
    }
}

/// Both stages' settings, as stored in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublesConfig {
    pub partition: PartitionConfig,
    pub matching: MatchConfig,
}

impl DoublesConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DoublesError::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|source| DoublesError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.partition.validate()?;
        self.matching.validate()
    }
}
