use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use super::bucket::CountBucket;
use super::error::{IoPhase, Phase, Result};

/// Prefix of the per-invocation scratch directory.
const WORKSPACE_PREFIX: &str = "fcountsort-";

/// One sorted chunk persisted to disk.
///
/// The file is opened read+write: the splitter writes it once, rewinds it,
/// and the merge then reads it forward through `&File`.
pub struct SortedRun {
    pub(crate) seq: usize,
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) lines: u64,
}

impl SortedRun {
    /// Creation order, starting at 0. Lower wins merge ties.
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written to the run.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

/// Count -> bucket handle map. Buckets are created on first use.
pub struct BucketRegistry {
    dir: PathBuf,
    buckets: HashMap<u64, CountBucket>,
}

impl BucketRegistry {
    fn new(dir: PathBuf) -> Self {
        BucketRegistry {
            dir,
            buckets: HashMap::new(),
        }
    }

    /// Bucket for `count`, creating and registering its file on first use.
    pub fn get_or_create(&mut self, count: u64) -> io::Result<&mut CountBucket> {
        match self.buckets.entry(count) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let bucket = CountBucket::create(&self.dir, count)?;
                debug!("created count bucket {}", bucket.path().display());
                Ok(e.insert(bucket))
            }
        }
    }

    pub fn get(&self, count: u64) -> Option<&CountBucket> {
        self.buckets.get(&count)
    }

    /// Count keys in no particular order.
    pub fn counts(&self) -> Vec<u64> {
        self.buckets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub(crate) fn buckets_mut(&mut self) -> impl Iterator<Item = &mut CountBucket> {
        self.buckets.values_mut()
    }
}

/// Scratch directory and every handle opened in it for one invocation.
///
/// `close` is the orderly teardown. Dropping a workspace without closing it
/// still removes the directory, but close errors are then lost.
pub struct Workspace {
    dir: TempDir,
    runs: Vec<SortedRun>,
    buckets: BucketRegistry,
}

impl Workspace {
    /// Allocate a fresh, uniquely named directory under `temp_root`,
    /// or under the system temp dir when `None`.
    pub fn create(temp_root: Option<&Path>) -> Result<Workspace> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .phase(Phase::Workspace)?;
        debug!("workspace created at {}", dir.path().display());

        let buckets = BucketRegistry::new(dir.path().to_path_buf());
        Ok(Workspace {
            dir,
            runs: Vec::new(),
            buckets,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Register a new, empty run file named by the next sequence number.
    pub fn create_run(&mut self) -> Result<&mut SortedRun> {
        let seq = self.runs.len();
        let path = self.dir.path().join(format!("run-{}", seq));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .phase(Phase::Split)?;
        self.runs.push(SortedRun {
            seq,
            path,
            file,
            lines: 0,
        });
        let last = self.runs.len() - 1;
        Ok(&mut self.runs[last])
    }

    pub fn runs(&self) -> &[SortedRun] {
        &self.runs
    }

    pub fn buckets(&self) -> &BucketRegistry {
        &self.buckets
    }

    pub fn buckets_mut(&mut self) -> &mut BucketRegistry {
        &mut self.buckets
    }

    /// Runs (read side) and buckets (write side) at once, for the merge pass.
    pub fn runs_and_buckets(&mut self) -> (&[SortedRun], &mut BucketRegistry) {
        (&self.runs, &mut self.buckets)
    }

    /// Close every tracked handle, then remove the directory.
    ///
    /// A handle that fails to close is logged and skipped so its siblings and
    /// the directory are still released. Only directory removal can fail.
    pub fn close(self) -> Result<()> {
        let Workspace { dir, runs, buckets } = self;

        for bucket in buckets.buckets.into_values() {
            let path = bucket.path().to_path_buf();
            if let Err(e) = bucket.close() {
                warn!("closing count bucket {}: {}", path.display(), e);
            }
        }

        // Runs were flushed when written and are only read afterwards.
        drop(runs);

        let path = dir.path().to_path_buf();
        dir.close().phase(Phase::Teardown)?;
        debug!("workspace removed: {}", path.display());
        Ok(())
    }
}
