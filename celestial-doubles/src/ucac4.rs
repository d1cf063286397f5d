//! UCAC4 zone file decoding.
//!
//! The catalog ships as 900 zone files (`z001` … `z900`), each a packed
//! array of 78-byte little-endian records sorted by right ascension. Only
//! the fields needed for double-star work are decoded:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0  | 4 | right ascension, mas (u32) |
//! | 4  | 4 | south polar distance, mas (u32) |
//! | 8  | 2 | model magnitude, mmag (u16) |
//! | 14 | 1 | double-star flag |
//! | 24 | 2 | proper motion RA (i16) |
//! | 26 | 2 | proper motion Dec (i16) |
//! | 48 | 2 | APASS V magnitude, mmag (u16); 20000 when absent |
//!
//! Zone files may be gzip-compressed (`z001.gz`).

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::MultiGzDecoder;

use crate::coords::{ra_mas_to_rad, spd_mas_to_dec_rad};
use crate::error::{DoublesError, Result};
use crate::star::{CatalogId, MagSource, StarRecord};

pub const RECORD_SIZE: usize = 78;
pub const FIRST_ZONE: u16 = 1;
pub const LAST_ZONE: u16 = 900;
/// APASS magnitude value meaning "not observed".
pub const NO_SURVEY_MAG: u16 = 20_000;

/// Decode one raw record into a star with the given identity.
pub fn decode_record(buf: &[u8; RECORD_SIZE], id: CatalogId) -> StarRecord {
    let survey_mag = LittleEndian::read_u16(&buf[48..50]);
    let (mag, mag_source) = if survey_mag == NO_SURVEY_MAG {
        (LittleEndian::read_u16(&buf[8..10]), MagSource::Model)
    } else {
        (survey_mag, MagSource::Survey)
    };

    StarRecord {
        ra: ra_mas_to_rad(LittleEndian::read_u32(&buf[0..4])),
        dec: spd_mas_to_dec_rad(LittleEndian::read_u32(&buf[4..8])),
        mag: mag as i32,
        mag_source,
        pm_ra: LittleEndian::read_i16(&buf[24..26]) as i32,
        pm_dec: LittleEndian::read_i16(&buf[26..28]) as i32,
        double_flag: buf[14],
        id,
    }
}

/// Locate a zone file in `dir`, preferring the uncompressed form.
pub fn zone_path(dir: &Path, zone: u16) -> Result<PathBuf> {
    let plain = dir.join(format!("z{:03}", zone));
    if plain.is_file() {
        return Ok(plain);
    }
    let gz = dir.join(format!("z{:03}.gz", zone));
    if gz.is_file() {
        return Ok(gz);
    }
    Err(DoublesError::io(
        plain,
        std::io::Error::new(ErrorKind::NotFound, "zone file not found (plain or .gz)"),
    ))
}

/// Streaming reader over one zone's stars, numbered from 1.
pub struct ZoneReader {
    zone: u16,
    path: PathBuf,
    reader: Box<dyn Read>,
    next_seq: u32,
    done: bool,
}

impl ZoneReader {
    pub fn open(dir: &Path, zone: u16) -> Result<Self> {
        let path = zone_path(dir, zone)?;
        let file = File::open(&path).map_err(|e| DoublesError::io(&path, e))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(zone, path, reader))
    }

    /// Wrap an arbitrary byte source; `path` is only used in error messages.
    pub fn new(zone: u16, path: impl Into<PathBuf>, reader: Box<dyn Read>) -> Self {
        Self {
            zone,
            path: path.into(),
            reader,
            next_seq: 1,
            done: false,
        }
    }

    pub fn zone(&self) -> u16 {
        self.zone
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&mut self) -> Result<Option<StarRecord>> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DoublesError::io(&self.path, e)),
            }
        }
        match filled {
            0 => Ok(None),
            RECORD_SIZE => {
                let id = CatalogId {
                    zone: self.zone,
                    seq: self.next_seq,
                };
                self.next_seq += 1;
                Ok(Some(decode_record(&buf, id)))
            }
            trailing => Err(DoublesError::TruncatedRecord {
                path: self.path.clone(),
                trailing,
            }),
        }
    }
}

impl Iterator for ZoneReader {
    type Item = Result<StarRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Pack a raw record; the inverse of [`decode_record`] for the fields it reads.
pub fn encode_record(
    ra_mas: u32,
    spd_mas: u32,
    model_mag: u16,
    survey_mag: u16,
    pm_ra: i16,
    pm_dec: i16,
    double_flag: u8,
) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    LittleEndian::write_u32(&mut buf[0..4], ra_mas);
    LittleEndian::write_u32(&mut buf[4..8], spd_mas);
    LittleEndian::write_u16(&mut buf[8..10], model_mag);
    buf[14] = double_flag;
    LittleEndian::write_i16(&mut buf[24..26], pm_ra);
    LittleEndian::write_i16(&mut buf[26..28], pm_dec);
    LittleEndian::write_u16(&mut buf[48..50], survey_mag);
    buf
}
