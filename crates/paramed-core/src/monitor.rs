//! Periodic progress polling while an extraction run is in flight.

use std::fmt;
use std::time::Duration;

use paramed_store::{SqliteStore, StoreError};
use tokio::sync::watch;

use crate::report::ProgressReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub skills: usize,
    pub skills_with_steps: usize,
    pub skills_with_questions: usize,
    pub steps: i64,
    pub questions: i64,
}

impl From<&ProgressReport> for Snapshot {
    fn from(report: &ProgressReport) -> Self {
        Self {
            skills: report.total_skills,
            skills_with_steps: report.skills_with_steps,
            skills_with_questions: report.skills_with_questions,
            steps: report.total_steps,
            questions: report.total_questions,
        }
    }
}

/// Change since the previous poll; all zero on the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub skills_with_steps: i64,
    pub skills_with_questions: i64,
    pub steps: i64,
    pub questions: i64,
}

fn signed(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Snapshot {
    #[must_use]
    pub fn delta_since(&self, previous: &Self) -> SnapshotDelta {
        SnapshotDelta {
            skills_with_steps: signed(self.skills_with_steps) - signed(previous.skills_with_steps),
            skills_with_questions: signed(self.skills_with_questions)
                - signed(previous.skills_with_questions),
            steps: self.steps - previous.steps,
            questions: self.questions - previous.questions,
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} skills with steps, {}/{} with questions, {} steps, {} questions",
            self.skills_with_steps,
            self.skills,
            self.skills_with_questions,
            self.skills,
            self.steps,
            self.questions
        )
    }
}

impl fmt::Display for SnapshotDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:+} skills with steps, {:+} with questions, {:+} steps, {:+} questions",
            self.skills_with_steps, self.skills_with_questions, self.steps, self.questions
        )
    }
}

pub struct ProgressMonitor {
    store: SqliteStore,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
    last: Option<Snapshot>,
}

impl ProgressMonitor {
    #[must_use]
    pub fn new(store: SqliteStore, interval: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            store,
            interval,
            shutdown_rx,
            last: None,
        }
    }

    /// Take a snapshot and compare it with the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn poll(&mut self) -> Result<(Snapshot, SnapshotDelta), StoreError> {
        let snapshot = Snapshot::from(&ProgressReport::collect(&self.store).await?);
        let delta = self
            .last
            .map(|prev| snapshot.delta_since(&prev))
            .unwrap_or_default();
        self.last = Some(snapshot);
        Ok((snapshot, delta))
    }

    /// Poll every interval until shutdown is signalled.
    ///
    /// Failed polls are logged and the loop keeps going.
    pub async fn run<F>(&mut self, mut on_snapshot: F)
    where
        F: FnMut(&Snapshot, &SnapshotDelta),
    {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.poll().await {
                        Ok((snapshot, delta)) => {
                            tracing::info!(
                                steps = snapshot.steps,
                                questions = snapshot.questions,
                                new_steps = delta.steps,
                                new_questions = delta.questions,
                                "progress"
                            );
                            on_snapshot(&snapshot, &delta);
                        }
                        Err(e) => tracing::warn!("progress poll failed: {e}"),
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        tracing::info!("monitor shutting down");
                        break;
                    }
                }
            }
        }
    }
}
