//! K-way merge over sorted runs with run-length counting.
//!
//! Every run is non-decreasing and the heap always yields the global minimum,
//! so all occurrences of a value come out back to back. Counting consecutive
//! equal lines is therefore exact, and each distinct value reaches the sink once.
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, Read};

use log::{debug, info};

use super::error::{IoPhase, Phase, Result};
use super::workspace::SortedRun;
use crate::common::io::read_record;

/// Read buffer per run. Kept smaller than the input buffer since one is open
/// per run for the whole merge.
const MERGE_BUF_SIZE: usize = 64 * 1024;

/// Receiver of (value, count) pairs, in ascending value order.
pub trait CountSink {
    fn record(&mut self, value: &[u8], count: u64) -> Result<()>;
}

/// Collects pairs in memory.
impl CountSink for Vec<(Vec<u8>, u64)> {
    fn record(&mut self, value: &[u8], count: u64) -> Result<()> {
        self.push((value.to_vec(), count));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Lines pulled from all runs.
    pub lines: u64,
    /// Distinct values handed to the sink.
    pub distinct: u64,
}

/// Forward-only reader over one sorted run.
pub struct MergeCursor<R: Read> {
    run: usize,
    reader: BufReader<R>,
}

impl<'a> MergeCursor<&'a File> {
    pub fn open(run: &'a SortedRun) -> Self {
        MergeCursor {
            run: run.seq(),
            reader: BufReader::with_capacity(MERGE_BUF_SIZE, run.file()),
        }
    }
}

impl<R: Read> MergeCursor<R> {
    pub fn new(run: usize, reader: R) -> Self {
        MergeCursor {
            run,
            reader: BufReader::with_capacity(MERGE_BUF_SIZE, reader),
        }
    }

    /// Sequence number of the run this cursor reads.
    pub fn run(&self) -> usize {
        self.run
    }

    /// Next line of the run, reusing `buf`'s allocation. `None` once exhausted.
    pub fn next_line(&mut self, delimiter: u8, mut buf: Vec<u8>) -> Result<Option<Vec<u8>>> {
        if read_record(&mut self.reader, delimiter, &mut buf).phase(Phase::Merge)? {
            Ok(Some(buf))
        } else {
            Ok(None)
        }
    }
}

/// Head line of a cursor. Field order gives the heap key: line first, then
/// cursor position, so equal lines come out lowest run first.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Head {
    line: Vec<u8>,
    cursor: usize,
}

/// Merge all `runs` and emit one (value, count) pair per distinct line.
pub fn merge_count<S: CountSink + ?Sized>(
    runs: &[SortedRun],
    delimiter: u8,
    sink: &mut S,
) -> Result<MergeStats> {
    let cursors: Vec<MergeCursor<&File>> = runs.iter().map(MergeCursor::open).collect();
    merge_cursors(cursors, delimiter, sink)
}

/// Merge over arbitrary cursors. Cursors must be ordered by run sequence
/// number; ties between equal lines go to the earlier cursor.
pub fn merge_cursors<R: Read, S: CountSink + ?Sized>(
    mut cursors: Vec<MergeCursor<R>>,
    delimiter: u8,
    sink: &mut S,
) -> Result<MergeStats> {
    let mut heap: BinaryHeap<Reverse<Head>> = BinaryHeap::with_capacity(cursors.len());
    for (i, cursor) in cursors.iter_mut().enumerate() {
        if let Some(line) = cursor.next_line(delimiter, Vec::new())? {
            heap.push(Reverse(Head { line, cursor: i }));
        }
    }

    let mut stats = MergeStats::default();
    let mut current: Option<(Vec<u8>, u64)> = None;

    while let Some(Reverse(Head { line, cursor })) = heap.pop() {
        stats.lines += 1;

        // Whichever buffer is no longer needed gets reused for the next read.
        let spare = if let Some((value, count)) = current.as_mut() {
            if *value == line {
                *count += 1;
                line
            } else {
                sink.record(value.as_slice(), *count)?;
                stats.distinct += 1;
                *count = 1;
                std::mem::replace(value, line)
            }
        } else {
            current = Some((line, 1));
            Vec::new()
        };

        match cursors[cursor].next_line(delimiter, spare)? {
            Some(next) => heap.push(Reverse(Head { line: next, cursor })),
            None => debug!("run {} exhausted", cursors[cursor].run()),
        }
    }

    if let Some((value, count)) = current {
        sink.record(&value, count)?;
        stats.distinct += 1;
    }

    info!(
        "merged {} lines from {} runs into {} distinct values",
        stats.lines,
        cursors.len(),
        stats.distinct
    );
    Ok(stats)
}
