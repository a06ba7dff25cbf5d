//! Taxonomy tree builder.
//!
//! Crawls listing pages through a [`PageSource`], starting at the root
//! listing (`""`), and assembles the taxonomy in a [`NodeRegistry`].
//!
//! # Workflow
//!
//! 1. Pop a listing path from the work queue and fetch it on a worker.
//! 2. For every returned row: drop placeholders, canonicalize the number,
//!    resolve the parent and register the node (idempotent per canonical
//!    number).
//! 3. Queue the row's *raw* number as the next listing path, unless that
//!    path was already visited.
//! 4. Repeat until the queue is empty and no fetch is in flight, or until
//!    the shutdown future resolves.
//!
//! # Concurrency
//!
//! At most `concurrency` fetches run at once, each on its own tokio task.
//! Fetch results are applied by the coordinating task only, so the
//! registry and the visited-path set are never touched concurrently and
//! every check-and-insert is atomic.
//!
//! # Failures
//!
//! A failed fetch is logged and its subtree skipped; siblings continue.
//! Rows whose parent cannot be resolved are logged and dropped. Neither
//! fails the build: the result is the best-effort tree from every page
//! that succeeded.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::listing::is_placeholder_name;
use crate::models::{ListingEntry, TaxonomyNode};
use crate::number::{canonicalize, is_valid_number};
use crate::persist::count_nodes;
use crate::progress::{BuildProgressEvent, BuildProgressReporter, NoProgress};
use crate::registry::{NodeRegistry, Registration};
use crate::source::PageSource;

/// Default number of concurrent page fetches.
pub const DEFAULT_CONCURRENCY: usize = 12;

/// Path of the root listing page.
pub const ROOT_PATH: &str = "";

/// Result of a build run.
#[derive(Debug)]
pub struct BuildReport {
    /// Taxonomy in discovery order (unsorted; see [`crate::persist`]).
    pub tree: Vec<TaxonomyNode>,
    /// Number of listing pages fetched successfully.
    pub fetched: usize,
    /// Listing paths whose fetch failed.
    pub failed_paths: Vec<String>,
    /// Rows dropped because no ancestor was registered.
    pub unattachable: Vec<ListingEntry>,
    /// Whether the build stopped on the shutdown signal.
    pub interrupted: bool,
}

impl BuildReport {
    /// Total nodes in the tree, at every depth.
    pub fn node_count(&self) -> usize {
        count_nodes(&self.tree)
    }
}

/// Crawls a [`PageSource`] into a taxonomy.
pub struct TreeBuilder {
    source: Arc<dyn PageSource>,
    concurrency: usize,
    progress: Box<dyn BuildProgressReporter>,
}

impl TreeBuilder {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
            progress: Box::new(NoProgress),
        }
    }

    /// Set the maximum number of concurrent fetches (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn BuildProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Crawl the whole source.
    pub async fn build(&self) -> BuildReport {
        self.build_until(std::future::pending()).await
    }

    /// Crawl until done or until `shutdown` resolves, whichever comes
    /// first. On shutdown, in-flight fetches are aborted and the report
    /// holds the tree assembled so far.
    pub async fn build_until<F>(&self, shutdown: F) -> BuildReport
    where
        F: Future<Output = ()>,
    {
        let mut run = BuildRun::default();
        run.enqueue(ROOT_PATH);

        let mut in_flight: JoinSet<(String, Result<Vec<ListingEntry>>)> = JoinSet::new();
        tokio::pin!(shutdown);

        info!(concurrency = self.concurrency, "Starting taxonomy crawl");

        loop {
            while in_flight.len() < self.concurrency {
                let Some(path) = run.queue.pop_front() else {
                    break;
                };
                let source = Arc::clone(&self.source);
                in_flight.spawn(async move {
                    let result = AssertUnwindSafe(source.fetch_entries(&path))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("fetch panicked")));
                    (path, result)
                });
            }

            let joined = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(
                        in_flight = in_flight.len(),
                        queued = run.queue.len(),
                        "Build interrupted"
                    );
                    in_flight.abort_all();
                    run.interrupted = true;
                    break;
                }
                joined = in_flight.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((path, Ok(entries))) => {
                    let created = run.apply(&path, entries);
                    self.progress.report(BuildProgressEvent::Fetched {
                        path,
                        created,
                        total: run.registry.len(),
                        pending: run.queue.len() + in_flight.len(),
                    });
                }
                Ok((path, Err(e))) => {
                    warn!("Error processing {:?}: {:#}", path, e);
                    self.progress
                        .report(BuildProgressEvent::Failed { path: path.clone() });
                    run.failed_paths.push(path);
                }
                // Only reachable through cancellation; panics are caught in the task.
                Err(e) => {
                    warn!("Fetch task failed: {}", e);
                }
            }
        }

        let report = run.finish();
        info!(
            nodes = report.node_count(),
            fetched = report.fetched,
            failed = report.failed_paths.len(),
            unattachable = report.unattachable.len(),
            "Crawl finished"
        );
        report
    }
}

/// Mutable state of one build run, owned by the coordinating task.
#[derive(Default)]
struct BuildRun {
    registry: NodeRegistry,
    visited: HashSet<String>,
    queue: VecDeque<String>,
    fetched: usize,
    failed_paths: Vec<String>,
    unattachable: Vec<ListingEntry>,
    interrupted: bool,
}

impl BuildRun {
    fn enqueue(&mut self, path: &str) {
        if self.visited.insert(path.to_string()) {
            self.queue.push_back(path.to_string());
        }
    }

    /// Register the rows of one fetched page; returns the number of nodes
    /// created.
    fn apply(&mut self, path: &str, entries: Vec<ListingEntry>) -> usize {
        self.fetched += 1;
        let mut created = 0;

        for mut entry in entries {
            entry.number = entry.number.trim().to_string();
            entry.name = entry.name.trim().to_string();

            if is_placeholder_name(&entry.name) {
                continue;
            }
            if !is_valid_number(&entry.number) {
                warn!(
                    "Skipping row {:?} on {:?}: invalid number {:?}",
                    entry.name, path, entry.number
                );
                continue;
            }

            match self.registry.register(&entry) {
                Registration::Created { .. } => {
                    created += 1;
                    debug!("Added {}: {}", canonicalize(&entry.number), entry.name);
                }
                Registration::Existing(_) => {}
                Registration::Unattachable => {
                    warn!(
                        "Dropping {} {:?} found on {:?}: no parent registered",
                        entry.number, entry.name, path
                    );
                    self.unattachable.push(entry);
                    continue;
                }
            }

            self.enqueue(&entry.number);
        }

        created
    }

    fn finish(self) -> BuildReport {
        BuildReport {
            tree: self.registry.snapshot(),
            fetched: self.fetched,
            failed_paths: self.failed_paths,
            unattachable: self.unattachable,
            interrupted: self.interrupted,
        }
    }
}
