//! On-disk storage for buckets and the candidate list.
//!
//! Bucket files hold a 16-byte header followed by packed 40-byte star
//! records:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `CDBK` |
//! | 4 | 4 | format version (u32) |
//! | 8 | 8 | reserved |
//!
//! The candidate file uses the same header shape with magic `CDCN` and
//! the record count (u64) in the last eight bytes. The count is only
//! known once partitioning finishes, so the header is written as zeros
//! first and patched on [`CandidateWriter::finish`]; an unfinished file
//! therefore fails magic validation instead of reading as empty.
//!
//! Bucket keys become file names (`f{ra}_s{dec}.bkt`) here and nowhere else.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::BucketKey;
use crate::error::{DoublesError, Result};
use crate::star::{
    CandidateRecord, StarRecord, CANDIDATE_RECORD_SIZE, STAR_RECORD_SIZE,
};

pub const BUCKET_MAGIC: &[u8; 4] = b"CDBK";
pub const CANDIDATE_MAGIC: &[u8; 4] = b"CDCN";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 16;

const BUCKET_EXTENSION: &str = "bkt";
const CANDIDATES_FILE: &str = "candidates.bin";

/// A directory of bucket files plus the candidate list.
#[derive(Debug, Clone)]
pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    /// Create a store for a new partitioning run.
    ///
    /// Bucket files are append-only, so partitioning into a directory that
    /// already holds output would silently double every record. Such a
    /// directory is rejected; see [`BucketStore::create_clean`].
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self::prepare(root.as_ref())?;
        if store.candidates_path().exists() || !store.buckets()?.is_empty() {
            return Err(DoublesError::RegionsNotEmpty(store.root));
        }
        Ok(store)
    }

    /// Create a store for a new run, deleting any earlier output first.
    pub fn create_clean(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self::prepare(root.as_ref())?;
        let stale = store.buckets()?;
        for key in &stale {
            let path = store.bucket_path(*key);
            fs::remove_file(&path).map_err(|e| DoublesError::io(&path, e))?;
        }
        let candidates = store.candidates_path();
        if candidates.exists() {
            fs::remove_file(&candidates).map_err(|e| DoublesError::io(&candidates, e))?;
        }
        if !stale.is_empty() {
            log::info!("Removed {} stale buckets from {:?}", stale.len(), store.root);
        }
        Ok(store)
    }

    /// Open an existing store for reading.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let meta = fs::metadata(root).map_err(|e| DoublesError::io(root, e))?;
        if !meta.is_dir() {
            return Err(DoublesError::io(
                root,
                std::io::Error::new(ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn prepare(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| DoublesError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_path(&self, key: BucketKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, BUCKET_EXTENSION))
    }

    pub fn candidates_path(&self) -> PathBuf {
        self.root.join(CANDIDATES_FILE)
    }

    /// Keys of every bucket file present, sorted.
    pub fn buckets(&self) -> Result<Vec<BucketKey>> {
        let entries = fs::read_dir(&self.root).map_err(|e| DoublesError::io(&self.root, e))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DoublesError::io(&self.root, e))?;
            if let Some(key) = parse_bucket_file_name(&entry.file_name().to_string_lossy()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Number of star records stored in a bucket, derived from its size.
    pub fn bucket_len(&self, key: BucketKey) -> Result<u64> {
        let path = self.bucket_path(key);
        let len = fs::metadata(&path)
            .map_err(|e| DoublesError::io(&path, e))?
            .len();
        Ok(len.saturating_sub(HEADER_SIZE as u64) / STAR_RECORD_SIZE as u64)
    }

    /// Append stars to a bucket in one open/write/close cycle.
    pub fn append(&self, key: BucketKey, stars: &[StarRecord]) -> Result<()> {
        let path = self.bucket_path(key);
        let mut writer = open_for_append(&path)?;
        for star in stars {
            write_star(&mut writer, star).map_err(|e| DoublesError::io(&path, e))?;
        }
        writer.flush().map_err(|e| DoublesError::io(&path, e))
    }

    /// Open a bucket for a sequential scan.
    pub fn open_bucket(&self, key: BucketKey) -> Result<BucketReader> {
        let path = self.bucket_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DoublesError::MissingBucket {
                    key,
                    root: self.root.clone(),
                })
            }
            Err(e) => return Err(DoublesError::io(&path, e)),
        };
        let mut reader = BufReader::new(file);
        read_header(&mut reader, &path, BUCKET_MAGIC)?;
        Ok(BucketReader { key, path, reader })
    }

    pub fn create_candidates(&self) -> Result<CandidateWriter> {
        CandidateWriter::create(self.candidates_path())
    }

    pub fn open_candidates(&self) -> Result<CandidateReader> {
        CandidateReader::open(self.candidates_path())
    }
}

fn parse_bucket_file_name(name: &str) -> Option<BucketKey> {
    let stem = name.strip_suffix(BUCKET_EXTENSION)?.strip_suffix('.')?;
    let (ra, dec) = stem.strip_prefix('f')?.split_once("_s")?;
    Some(BucketKey {
        ra: ra.parse().ok()?,
        dec: dec.parse().ok()?,
    })
}

/// Open a bucket file for appending, writing the header if it is new.
fn open_for_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DoublesError::io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| DoublesError::io(path, e))?
        .len();
    let mut writer = BufWriter::new(file);
    if len == 0 {
        write_header(&mut writer, BUCKET_MAGIC, 0).map_err(|e| DoublesError::io(path, e))?;
    }
    Ok(writer)
}

fn write_header<W: Write>(writer: &mut W, magic: &[u8; 4], trailer: u64) -> std::io::Result<()> {
    writer.write_all(magic)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u64::<LittleEndian>(trailer)
}

/// Validate magic and version, returning the trailing u64 of the header.
fn read_header<R: Read>(reader: &mut R, path: &Path, magic: &[u8; 4]) -> Result<u64> {
    let mut header = [0u8; HEADER_SIZE];
    let got = read_full(reader, &mut header).map_err(|e| DoublesError::io(path, e))?;
    if got < HEADER_SIZE {
        return Err(DoublesError::TruncatedRecord {
            path: path.to_path_buf(),
            trailing: got,
        });
    }

    let mut actual = [0u8; 4];
    actual.copy_from_slice(&header[0..4]);
    if &actual != magic {
        return Err(DoublesError::BadMagic {
            path: path.to_path_buf(),
            expected: *magic,
            actual,
        });
    }

    let mut rest = &header[4..];
    let version = rest
        .read_u32::<LittleEndian>()
        .map_err(|e| DoublesError::io(path, e))?;
    if version != FORMAT_VERSION {
        return Err(DoublesError::UnsupportedVersion {
            path: path.to_path_buf(),
            expected: FORMAT_VERSION,
            actual: version,
        });
    }
    rest.read_u64::<LittleEndian>()
        .map_err(|e| DoublesError::io(path, e))
}

fn write_star<W: Write>(writer: &mut W, star: &StarRecord) -> std::io::Result<()> {
    let mut buf = [0u8; STAR_RECORD_SIZE];
    star.encode(&mut buf);
    writer.write_all(&buf)
}

/// Fill `buf` as far as the reader allows, returning the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Exclusive writer for the partitioning stage.
///
/// Holds at most one bucket file open. Appending to a different bucket
/// flushes and closes the current one first; dropping the writer flushes
/// whatever is still open, so early exits never leave buffered records
/// behind. Call [`BucketWriter::finish`] to observe the final flush error.
#[derive(Debug)]
pub struct BucketWriter {
    store: BucketStore,
    current: Option<(BucketKey, BufWriter<File>)>,
    opens: u64,
}

impl BucketWriter {
    pub fn new(store: BucketStore) -> Self {
        Self {
            store,
            current: None,
            opens: 0,
        }
    }

    pub fn append(&mut self, key: BucketKey, star: &StarRecord) -> Result<()> {
        if self.current.as_ref().map(|(k, _)| *k) != Some(key) {
            self.close()?;
            let writer = open_for_append(&self.store.bucket_path(key))?;
            self.current = Some((key, writer));
            self.opens += 1;
        }
        if let Some((key, writer)) = self.current.as_mut() {
            write_star(writer, star).map_err(|e| DoublesError::io(self.store.bucket_path(*key), e))?;
        }
        Ok(())
    }

    /// Flush and close the open bucket, if any.
    pub fn close(&mut self) -> Result<()> {
        if let Some((key, mut writer)) = self.current.take() {
            writer
                .flush()
                .map_err(|e| DoublesError::io(self.store.bucket_path(key), e))?;
        }
        Ok(())
    }

    pub fn current(&self) -> Option<BucketKey> {
        self.current.as_ref().map(|(k, _)| *k)
    }

    /// How many times a bucket file has been opened by this writer.
    pub fn opens(&self) -> u64 {
        self.opens
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    pub fn finish(mut self) -> Result<()> {
        self.close()
    }
}

impl Drop for BucketWriter {
    fn drop(&mut self) {
        if let Some((key, mut writer)) = self.current.take() {
            if let Err(e) = writer.flush() {
                log::error!("Failed to flush bucket {}: {}", key, e);
            }
        }
    }
}

/// Sequential reader over one bucket's records.
#[derive(Debug)]
pub struct BucketReader {
    key: BucketKey,
    path: PathBuf,
    reader: BufReader<File>,
}

impl BucketReader {
    pub fn key(&self) -> BucketKey {
        self.key
    }

    /// Restart the scan at the first record.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(HEADER_SIZE as u64))
            .map_err(|e| DoublesError::io(&self.path, e))?;
        Ok(())
    }

    /// Read the next record, or `None` at end of file.
    pub fn next_star(&mut self) -> Result<Option<StarRecord>> {
        let mut buf = [0u8; STAR_RECORD_SIZE];
        let got = read_full(&mut self.reader, &mut buf).map_err(|e| DoublesError::io(&self.path, e))?;
        match got {
            0 => Ok(None),
            STAR_RECORD_SIZE => Ok(Some(StarRecord::decode(&buf))),
            trailing => Err(DoublesError::TruncatedRecord {
                path: self.path.clone(),
                trailing,
            }),
        }
    }
}

impl Iterator for BucketReader {
    type Item = Result<StarRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_star().transpose()
    }
}

/// Writer for the bucket-tagged candidate list.
#[derive(Debug)]
pub struct CandidateWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    count: u64,
}

impl CandidateWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| DoublesError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&[0u8; HEADER_SIZE])
            .map_err(|e| DoublesError::io(&path, e))?;
        Ok(Self {
            path,
            writer,
            count: 0,
        })
    }

    pub fn push(&mut self, candidate: &CandidateRecord) -> Result<()> {
        let mut buf = [0u8; CANDIDATE_RECORD_SIZE];
        candidate.encode(&mut buf);
        self.writer
            .write_all(&buf)
            .map_err(|e| DoublesError::io(&self.path, e))?;
        self.count += 1;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Flush the records and patch the header with the final count.
    pub fn finish(mut self) -> Result<u64> {
        let path = self.path.clone();
        self.writer.flush().map_err(|e| DoublesError::io(&path, e))?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(0))
            .map_err(|e| DoublesError::io(&path, e))?;
        write_header(file, CANDIDATE_MAGIC, self.count).map_err(|e| DoublesError::io(&path, e))?;
        file.flush().map_err(|e| DoublesError::io(&path, e))?;
        Ok(self.count)
    }
}

/// Sequential reader over a finished candidate list.
#[derive(Debug)]
pub struct CandidateReader {
    path: PathBuf,
    reader: BufReader<File>,
    total: u64,
    read: u64,
}

impl CandidateReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| DoublesError::io(&path, e))?;
        let mut reader = BufReader::new(file);
        let total = read_header(&mut reader, &path, CANDIDATE_MAGIC)?;
        Ok(Self {
            path,
            reader,
            total,
            read: 0,
        })
    }

    /// Record count stated in the header.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn next_candidate(&mut self) -> Result<Option<CandidateRecord>> {
        if self.read >= self.total {
            return Ok(None);
        }
        let mut buf = [0u8; CANDIDATE_RECORD_SIZE];
        let got = read_full(&mut self.reader, &mut buf).map_err(|e| DoublesError::io(&self.path, e))?;
        if got < CANDIDATE_RECORD_SIZE {
            return Err(DoublesError::TruncatedRecord {
                path: self.path.clone(),
                trailing: got,
            });
        }
        self.read += 1;
        Ok(Some(CandidateRecord::decode(&buf)))
    }
}

impl Iterator for CandidateReader {
    type Item = Result<CandidateRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_candidate().transpose()
    }
}
