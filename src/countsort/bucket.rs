//! Count buckets: one append-only file per distinct occurrence count.
//!
//! The merge feeds values in ascending order, so each bucket ends up sorted.
//! Writing buckets out by descending count then gives the final report.
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::info;

use super::error::{IoPhase, Phase, Result};
use super::merge::CountSink;
use super::workspace::BucketRegistry;

/// Write buffer per bucket file.
const BUCKET_BUF_SIZE: usize = 64 * 1024;

/// How each report line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountFormat {
    /// `value<TAB>count`
    #[default]
    Tabbed,
    /// `value` only; ordering still follows the counts.
    ValueOnly,
}

/// Persisted records of every value that occurred exactly `count` times.
pub struct CountBucket {
    count: u64,
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl CountBucket {
    pub(crate) fn create(dir: &Path, count: u64) -> io::Result<CountBucket> {
        let path = dir.join(format!("count-{}", count));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(CountBucket {
            count,
            path,
            writer: BufWriter::with_capacity(BUCKET_BUF_SIZE, file),
            records: 0,
        })
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended.
    pub fn records(&self) -> u64 {
        self.records
    }

    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        self.writer.write_all(record)?;
        self.records += 1;
        Ok(())
    }

    /// Flush pending records and rewind to the start for reading.
    pub(crate) fn seal(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_mut().seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Reader over the sealed bucket contents.
    pub(crate) fn reader(&self) -> BufReader<&File> {
        BufReader::with_capacity(BUCKET_BUF_SIZE, self.writer.get_ref())
    }

    /// Flush and close the handle, surfacing errors a plain drop would swallow.
    pub(crate) fn close(self) -> io::Result<()> {
        self.writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    }
}

/// Routes merge output into count buckets.
pub struct CountBucketer<'a> {
    registry: &'a mut BucketRegistry,
    format: CountFormat,
    delimiter: u8,
    record: Vec<u8>,
}

impl<'a> CountBucketer<'a> {
    pub fn new(registry: &'a mut BucketRegistry, format: CountFormat, delimiter: u8) -> Self {
        CountBucketer {
            registry,
            format,
            delimiter,
            record: Vec::with_capacity(256),
        }
    }
}

impl CountSink for CountBucketer<'_> {
    fn record(&mut self, value: &[u8], count: u64) -> Result<()> {
        self.record.clear();
        self.record.extend_from_slice(value);
        if self.format == CountFormat::Tabbed {
            let mut num = itoa::Buffer::new();
            self.record.push(b'\t');
            self.record.extend_from_slice(num.format(count).as_bytes());
        }
        self.record.push(self.delimiter);

        let bucket = self.registry.get_or_create(count).phase(Phase::Bucket)?;
        bucket.append(&self.record).phase(Phase::Bucket)
    }
}

/// Stream every bucket to `out`, highest count first, each in append order.
/// Returns the number of bytes written.
pub fn write_buckets<W: Write + ?Sized>(registry: &mut BucketRegistry, out: &mut W) -> Result<u64> {
    for bucket in registry.buckets_mut() {
        bucket.seal().phase(Phase::Write)?;
    }

    // Map iteration order is arbitrary; the report order comes from this sort.
    let mut counts = registry.counts();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    let mut written = 0u64;
    for count in counts {
        let Some(bucket) = registry.get(count) else {
            continue;
        };
        let mut reader = bucket.reader();
        written += io::copy(&mut reader, out).phase(Phase::Write)?;
    }
    out.flush().phase(Phase::Write)?;

    info!(
        "wrote {} bytes from {} count buckets",
        written,
        registry.len()
    );
    Ok(written)
}
