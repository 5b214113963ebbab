//! Parallel per-unit processing
//!
//! Every unit is replayed into a private `ScopeManager` by a pool of scoped
//! worker threads fed over a crossbeam channel. Results come back as
//! `UnitMessage`s and are merged single-threaded in input order, so the
//! merged tree does not depend on worker scheduling.

use crate::frontend::{UnitEvents, replay_unit};
use crate::language::LanguageRegistry;
use crate::scope::{MergeStats, ScopeManager};
use crate::{Error, Result};
use crossbeam::channel;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Message sent from workers to the coordinator
#[derive(Debug)]
pub enum UnitMessage {
    Replayed {
        index: usize,
        path: String,
        manager: ScopeManager,
    },
    Failed {
        index: usize,
        path: String,
        error: String,
    },
}

/// A unit that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub path: String,
    pub error: String,
}

/// Merged result of a pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    pub manager: ScopeManager,
    pub merge: MergeStats,
    pub failures: Vec<UnitFailure>,
}

pub struct Pipeline<'a> {
    registry: &'a LanguageRegistry,
    workers: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { registry, workers }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replay in-memory units and merge them
    pub fn process(&self, units: Vec<UnitEvents>) -> Result<PipelineOutput> {
        let jobs = units.into_iter().map(|u| (u.path.clone(), u)).collect();
        self.run(jobs, |unit| replay_unit(&unit, self.registry))
    }

    /// Load event files, replay them and merge them
    pub fn process_files(&self, paths: Vec<PathBuf>) -> Result<PipelineOutput> {
        let jobs = paths.into_iter().map(|p| (p.display().to_string(), p)).collect();
        self.run(jobs, |path| {
            let unit = UnitEvents::load(&path)?;
            replay_unit(&unit, self.registry)
        })
    }

    fn run<T, F>(&self, jobs: Vec<(String, T)>, job: F) -> Result<PipelineOutput>
    where
        T: Send,
        F: Fn(T) -> Result<ScopeManager> + Sync,
    {
        let total = jobs.len();
        let workers = self.workers.min(total).max(1);
        info!("Processing {} units on {} workers", total, workers);

        let (work_tx, work_rx) = channel::unbounded::<(usize, String, T)>();
        let (result_tx, result_rx) = channel::unbounded::<UnitMessage>();
        for (index, (path, item)) in jobs.into_iter().enumerate() {
            // The receiver is alive until the pool finishes
            let _ = work_tx.send((index, path, item));
        }
        drop(work_tx);

        crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let job = &job;
                s.spawn(move |_| {
                    for (index, path, item) in work_rx {
                        let message = match job(item) {
                            Ok(manager) => UnitMessage::Replayed { index, path, manager },
                            Err(e) => UnitMessage::Failed {
                                index,
                                path,
                                error: e.to_string(),
                            },
                        };
                        if result_tx.send(message).is_err() {
                            break;
                        }
                    }
                });
            }
        })
        .map_err(|_| Error::Worker("unit worker panicked".to_string()))?;
        drop(result_tx);

        let mut managers: Vec<Option<ScopeManager>> = (0..total).map(|_| None).collect();
        let mut failures = Vec::new();
        for message in result_rx {
            match message {
                UnitMessage::Replayed { index, manager, .. } => managers[index] = Some(manager),
                UnitMessage::Failed { index, path, error } => {
                    warn!("Failed to process {}: {}", path, error);
                    failures.push((index, UnitFailure { path, error }));
                }
            }
        }
        failures.sort_by_key(|(index, _)| *index);

        let mut manager = ScopeManager::new();
        let merge = manager.merge_from(managers.into_iter().flatten().collect());
        info!(
            "Merged {} units ({} failed): {} nodes, {} scopes",
            merge.units,
            failures.len(),
            manager.nodes().len(),
            manager.scope_count()
        );

        Ok(PipelineOutput {
            manager,
            merge,
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        })
    }
}
