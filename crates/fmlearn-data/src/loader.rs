//! File reader and parser worker pool.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fmlearn_core::config::DEFAULT_BATCH_SIZE;
use fmlearn_core::Instance;
use tracing::{debug, error, info};

use crate::error::{DataError, Result};
use crate::parser::InstanceParser;
use crate::queue::{BoundedQueue, Receiver};

/// Capacity of the raw line queue, in batches.
pub const LINE_QUEUE_CAPACITY: usize = 50;

/// Streams sample files as batches of lines or parsed instances.
///
/// A loader reads one file at a time; it becomes available again once the
/// reader has reached the end of the file or its queue was closed or dropped.
#[derive(Debug, Clone)]
pub struct DataLoader {
    parser: Arc<InstanceParser>,
    batch_size: usize,
    reading: Arc<AtomicBool>,
}

/// Holds the loader's read flag; released on drop.
struct ReadGuard(Arc<AtomicBool>);

impl ReadGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DataLoader {
    pub fn new(parser: InstanceParser) -> Self {
        Self::with_batch_size(parser, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(parser: InstanceParser, batch_size: usize) -> Self {
        Self {
            parser: Arc::new(parser),
            batch_size: batch_size.max(1),
            reading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn parser(&self) -> &InstanceParser {
        &self.parser
    }

    /// True while a reader thread owns the loader.
    pub fn is_busy(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    /// Starts a reader thread that pushes batches of at most `batch_size`
    /// lines, the last one possibly shorter.
    ///
    /// The returned queue is closed after the last batch. Closing or dropping
    /// it early stops the reader.
    ///
    /// # Errors
    ///
    /// [`DataError::Io`] if the file cannot be opened and [`DataError::Busy`]
    /// if another read on this loader is still running.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Receiver<Vec<String>>> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        let guard = ReadGuard::acquire(&self.reading).ok_or(DataError::Busy)?;

        let queue = BoundedQueue::new(LINE_QUEUE_CAPACITY);
        let out = queue.clone();
        let batch_size = self.batch_size;
        thread::Builder::new()
            .name("fmlearn-reader".to_string())
            .spawn(move || {
                read_lines(&path, file, batch_size, &out);
                drop(guard);
                out.close();
            })
            .map_err(|source| DataError::Spawn {
                name: "reader",
                source,
            })?;
        Ok(queue.into_receiver())
    }

    /// Parses a batch of raw lines.
    pub fn parse_batch<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Instance> {
        self.parser.parse_batch(lines)
    }

    /// Reads `path` and parses it on `workers` threads.
    ///
    /// Batches arrive in no particular order. The returned queue is closed
    /// once every worker has finished. Closing or dropping it early stops the
    /// workers, and the line queue closes when the last worker exits, which
    /// stops the reader.
    ///
    /// # Errors
    ///
    /// Same as [`read_file`](Self::read_file).
    pub fn parallel_iter(
        &self,
        path: impl AsRef<Path>,
        workers: usize,
    ) -> Result<Receiver<Vec<Instance>>> {
        let workers = workers.max(1);
        let lines = Arc::new(self.read_file(path.as_ref())?);
        let instances = BoundedQueue::new(2 * workers);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let worker_lines = Arc::clone(&lines);
            let out = instances.clone();
            let parser = Arc::clone(&self.parser);
            let spawned = thread::Builder::new()
                .name(format!("fmlearn-parser-{worker}"))
                .spawn(move || parse_worker(worker, &parser, &worker_lines, &out));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    lines.close();
                    instances.close();
                    return Err(DataError::Spawn {
                        name: "parser",
                        source,
                    });
                }
            }
        }

        let done = instances.clone();
        let path = path.as_ref().to_path_buf();
        let joiner = thread::Builder::new()
            .name("fmlearn-joiner".to_string())
            .spawn(move || join_workers(&path, handles, &done));
        if let Err(source) = joiner {
            lines.close();
            instances.close();
            return Err(DataError::Spawn {
                name: "joiner",
                source,
            });
        }
        Ok(instances.into_receiver())
    }
}

fn read_lines(path: &Path, file: File, batch_size: usize, out: &BoundedQueue<Vec<String>>) {
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut batch = Vec::with_capacity(batch_size);
    let mut count = 0u64;

    info!(path = %path.display(), "Start reading file");
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                batch.push(line.trim_end_matches(['\n', '\r']).to_string());
                count += 1;
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    if out.push(full).is_err() {
                        debug!(path = %path.display(), "Line queue closed, stop reading");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(path = %path.display(), "read file failed: {e}");
                break;
            }
        }
    }
    if !batch.is_empty() && out.push(batch).is_err() {
        debug!(path = %path.display(), "Line queue closed, dropping last batch");
    }
    info!(path = %path.display(), lines = count, "Finished reading file");
}

fn parse_worker(
    worker: usize,
    parser: &InstanceParser,
    lines: &Receiver<Vec<String>>,
    out: &BoundedQueue<Vec<Instance>>,
) {
    debug!(worker, "Parser worker started");
    let mut parsed = 0usize;
    while let Some(batch) = lines.pop() {
        let instances = parser.parse_batch(&batch);
        if instances.is_empty() {
            continue;
        }
        parsed += instances.len();
        if out.push(instances).is_err() {
            lines.close();
            break;
        }
    }
    debug!(worker, parsed, "Parser worker finished");
}

fn join_workers(path: &Path, handles: Vec<JoinHandle<()>>, out: &BoundedQueue<Vec<Instance>>) {
    for handle in handles {
        if handle.join().is_err() {
            error!(path = %path.display(), "parser worker panicked");
        }
    }
    out.close();
    debug!(path = %path.display(), "All parser workers finished");
}
