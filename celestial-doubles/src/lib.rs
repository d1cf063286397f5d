//! Search a star catalog for unlisted common-proper-motion double stars.
//!
//! Work happens in two stages. Partitioning streams the raw catalog into
//! roughly one-square-degree bucket files, copying stars that sit near a
//! bucket border into the neighbouring bucket too, and writes a list of
//! bright primary candidates. Matching then scans each candidate's bucket
//! for a fainter companion with similar proper motion and drops pairs that
//! the reference double-star catalog already lists.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`coords`] | Raw unit conversion, declination-corrected RA, sexagesimal I/O |
//! | [`star`] | [`StarRecord`](star::StarRecord), [`CandidateRecord`](star::CandidateRecord), fixed binary layout |
//! | [`region`] | [`BucketKey`](region::BucketKey), margin replication, [`Partitioner`](region::Partitioner), bucket storage |
//! | [`ucac4`] | [`ZoneReader`](ucac4::ZoneReader) over raw 78-byte zone records |
//! | [`reference`] | [`ReferenceIndex`](reference::ReferenceIndex) and box queries |
//! | [`matcher`] | [`find_unlisted_pairs`](matcher::find_unlisted_pairs), [`UnlistedPair`](matcher::UnlistedPair) |
//! | [`config`] | Thresholds for both stages |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_doubles::config::DoublesConfig;
//! use celestial_doubles::matcher::find_unlisted_pairs;
//! use celestial_doubles::reference::ReferenceIndex;
//! use celestial_doubles::region::{BucketStore, Partitioner};
//! use celestial_doubles::ucac4::ZoneReader;
//!
//! let config = DoublesConfig::default();
//! let store = BucketStore::create("regions")?;
//! let mut partitioner = Partitioner::new(store.clone(), &config.partition)?;
//! for star in ZoneReader::open("ucac4".as_ref(), 451)? {
//!     partitioner.add_star(&star?)?;
//! }
//! partitioner.finish()?;
//!
//! let reference = ReferenceIndex::load("wds_precise.txt")?;
//! let outcome = find_unlisted_pairs(&store, &reference, &config.matching)?;
//! println!("{} unlisted pairs", outcome.pairs.len());
//! ```
//!
//! # Features
//!
//! - **`cli`**: enables the `doubles` binary with `partition`, `search`
//!   and `info` subcommands.

pub mod config;
pub mod coords;
pub mod error;
pub mod matcher;
pub mod reference;
pub mod region;
pub mod star;
pub mod ucac4;

pub use error::{DoublesError, Result};
