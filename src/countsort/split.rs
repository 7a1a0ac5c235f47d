//! Chunk splitting: turn an unbounded line stream into sorted runs on disk.
//!
//! Memory is bounded by one chunk of at most `capacity` lines. Each chunk is
//! sorted in place (byte-wise) and written as `run-<seq>` in the workspace.
use std::io::{self, BufRead, BufWriter, Seek, SeekFrom, Write};

use log::{debug, info};

use super::error::{IoPhase, Phase, Result};
use super::workspace::{SortedRun, Workspace};
use crate::common::io::{RecordEnd, read_terminated, strip_cr};

/// Write buffer per run file.
const RUN_BUF_SIZE: usize = 256 * 1024;

/// Upper bound on the chunk slots reserved up front. Larger chunks grow on
/// demand.
const CHUNK_PREALLOC: usize = 64 * 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitStats {
    /// Sorted runs created.
    pub runs: usize,
    /// Input lines consumed.
    pub lines: u64,
}

/// Read `input` in chunks of up to `capacity` records and persist each
/// non-empty chunk as a sorted run. Runs are registered with `workspace`
/// in sequence order; the returned stats summarize what was created.
pub fn split_into_runs<R: BufRead + ?Sized>(
    input: &mut R,
    capacity: usize,
    delimiter: u8,
    workspace: &mut Workspace,
) -> Result<SplitStats> {
    let mut stats = SplitStats::default();
    let mut chunk: Vec<Vec<u8>> = Vec::with_capacity(capacity.min(CHUNK_PREALLOC));

    loop {
        chunk.clear();
        let n = fill_chunk(input, capacity, delimiter, &mut chunk).phase(Phase::Split)?;
        if n == 0 {
            break;
        }

        chunk.sort_unstable();
        let run = workspace.create_run()?;
        write_run(run, &chunk, delimiter).phase(Phase::Split)?;
        debug!("sorted run {} written: {} lines", run.seq(), run.lines());

        stats.runs += 1;
        stats.lines += n as u64;

        // A short chunk means the input hit EOF; don't read past it again.
        if n < capacity {
            break;
        }
    }

    info!(
        "number of sorted runs: {} ({} lines)",
        stats.runs, stats.lines
    );
    Ok(stats)
}

/// Read up to `capacity` records into `chunk`. Returns how many were read.
fn fill_chunk<R: BufRead + ?Sized>(
    input: &mut R,
    capacity: usize,
    delimiter: u8,
    chunk: &mut Vec<Vec<u8>>,
) -> io::Result<usize> {
    let mut line = Vec::new();
    while chunk.len() < capacity {
        match read_terminated(input, delimiter, &mut line)? {
            RecordEnd::Eof => break,
            // CRLF: the CR only belongs to the line ending when a newline follows it.
            RecordEnd::Delimited if delimiter == b'\n' => strip_cr(&mut line),
            RecordEnd::Delimited | RecordEnd::Unterminated => {}
        }
        chunk.push(std::mem::take(&mut line));
    }
    Ok(chunk.len())
}

/// Write a sorted chunk to `run`, then rewind the run for reading.
fn write_run(run: &mut SortedRun, chunk: &[Vec<u8>], delimiter: u8) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(RUN_BUF_SIZE, &run.file);
    for line in chunk {
        writer.write_all(line)?;
        writer.write_all(&[delimiter])?;
    }
    writer.into_inner().map_err(|e| e.into_error())?;

    (&run.file).seek(SeekFrom::Start(0))?;
    run.lines = chunk.len() as u64;
    Ok(())
}
