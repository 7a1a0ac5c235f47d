//! Engine for fcountsort: external sort, unique count, order by count.
//!
//! Three phases over one private workspace:
//! - split the input into sorted runs of at most `chunk_capacity` lines
//! - k-way merge the runs, counting equal neighbours into count buckets
//! - write buckets from the highest count down
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::{debug, info, warn};

use super::bucket::{CountBucketer, CountFormat, write_buckets};
use super::error::{CountSortError, IoPhase, Phase, Result};
use super::merge::merge_count;
use super::split::split_into_runs;
use super::workspace::Workspace;
use crate::common::io::{LineOutput, open_input};

/// Lines per chunk when none is given.
pub const DEFAULT_CHUNK_CAPACITY: usize = 100_000;

/// Smallest chunk capacity the splitter accepts.
pub const MIN_CHUNK_CAPACITY: usize = 2;

/// Configuration for one counting run.
#[derive(Debug, Clone)]
pub struct CountSortConfig {
    pub chunk_capacity: usize,
    pub input: String,
    pub output: String,
    pub temp_dir: Option<String>,
    pub format: CountFormat,
    pub zero_terminated: bool,
}

impl Default for CountSortConfig {
    fn default() -> Self {
        CountSortConfig {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            input: "input.txt".to_string(),
            output: "output.txt".to_string(),
            temp_dir: None,
            format: CountFormat::Tabbed,
            zero_terminated: false,
        }
    }
}

impl CountSortConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_capacity < MIN_CHUNK_CAPACITY {
            return Err(CountSortError::InvalidChunkCapacity(self.chunk_capacity));
        }
        Ok(())
    }

    #[inline]
    pub fn delimiter(&self) -> u8 {
        if self.zero_terminated { b'\0' } else { b'\n' }
    }
}

/// Summary of a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub runs: usize,
    pub lines: u64,
    pub distinct: u64,
    pub buckets: usize,
    pub bytes_written: u64,
}

/// One invocation: owns the workspace from `create` until `close`.
pub struct Engine {
    config: CountSortConfig,
    workspace: Workspace,
    started: bool,
}

impl Engine {
    pub fn create(config: CountSortConfig) -> Result<Engine> {
        config.validate()?;
        let workspace = Workspace::create(config.temp_dir.as_deref().map(Path::new))?;
        debug!(
            "engine ready: chunk capacity {}, workspace {}",
            config.chunk_capacity,
            workspace.path().display()
        );
        Ok(Engine {
            config,
            workspace,
            started: false,
        })
    }

    pub fn config(&self) -> &CountSortConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run against the configured input and output paths.
    ///
    /// The output is only created once the merge has finished, so a failed
    /// split or merge leaves any existing output untouched.
    pub fn run(&mut self) -> Result<Stats> {
        self.begin()?;
        let delimiter = self.config.delimiter();

        let (runs, lines) = {
            let mut input = open_input(&self.config.input).phase(Phase::Split)?;
            let split = split_into_runs(
                &mut *input,
                self.config.chunk_capacity,
                delimiter,
                &mut self.workspace,
            )?;
            (split.runs, split.lines)
        };
        let distinct = self.merge_into_buckets()?;

        let mut output = LineOutput::create(&self.config.output).phase(Phase::Write)?;
        self.finish(runs, lines, distinct, &mut output)
    }

    /// Run against caller-supplied streams instead of the configured paths.
    pub fn run_with<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<Stats>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        self.begin()?;
        let split = split_into_runs(
            input,
            self.config.chunk_capacity,
            self.config.delimiter(),
            &mut self.workspace,
        )?;
        let distinct = self.merge_into_buckets()?;
        self.finish(split.runs, split.lines, distinct, output)
    }

    /// Release the workspace. Call exactly once, whether `run` succeeded or not.
    pub fn close(self) -> Result<()> {
        self.workspace.close()
    }

    /// Close the engine and fold the close outcome into `result`, the value
    /// `run` or `run_with` returned. A run error is kept and a close error
    /// alongside it is only logged; after a successful run a close error is
    /// returned.
    pub fn complete(self, result: Result<Stats>) -> Result<Stats> {
        let closed = self.close();
        match result {
            Ok(stats) => closed.map(|()| stats),
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("{}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Runs, buckets and the scratch directory are single-use.
    fn begin(&mut self) -> Result<()> {
        if self.started {
            return Err(CountSortError::Io {
                phase: Phase::Workspace,
                source: io::Error::other("engine has already run; create a new one"),
            });
        }
        self.started = true;
        Ok(())
    }

    fn merge_into_buckets(&mut self) -> Result<u64> {
        let format = self.config.format;
        let delimiter = self.config.delimiter();
        let (runs, buckets) = self.workspace.runs_and_buckets();
        let mut bucketer = CountBucketer::new(buckets, format, delimiter);
        let merged = merge_count(runs, delimiter, &mut bucketer)?;
        Ok(merged.distinct)
    }

    fn finish<W: Write + ?Sized>(
        &mut self,
        runs: usize,
        lines: u64,
        distinct: u64,
        output: &mut W,
    ) -> Result<Stats> {
        let bytes_written = write_buckets(self.workspace.buckets_mut(), output)?;
        let stats = Stats {
            runs,
            lines,
            distinct,
            buckets: self.workspace.buckets().len(),
            bytes_written,
        };
        info!(
            "done: {} lines, {} distinct, {} runs, {} buckets",
            stats.lines, stats.distinct, stats.runs, stats.buckets
        );
        Ok(stats)
    }
}
