//! Drift monitoring: the sliding-window accumulator used on the serving path
//! and the one-shot drift check used by the batch pipeline.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::common::error::{MonitorError, MonitorResult};
use crate::common::time;
use crate::data::domain::Frame;
use crate::features::ENTITY_KEY;

use super::domain::{
    income_drift_report, DriftEngine, DriftReport, Project, ProjectId, ReportWorkspace,
};

/// Description given to projects created on first use.
pub const PROJECT_DESCRIPTION: &str = "Used to classify users into multiple income bands";

/// Result of one [`MonitoringService::iterate`] call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IterateOutcome {
    /// The window is not full yet.
    Waiting { have: usize, need: usize },
    /// A report was produced and handed to the workspace.
    Reported { report_id: Uuid },
}

/// Bounded FIFO window of recently scored rows compared against a fixed
/// reference dataset.
///
/// Once the window is full every call produces a report, including calls that
/// add a single row; the window is never reset after a trigger. Calls must be
/// serialized per instance, see [`SharedMonitor`].
pub struct MonitoringService {
    template: DriftReport,
    reference: Arc<Frame>,
    engine: Arc<dyn DriftEngine>,
    workspace: Arc<dyn ReportWorkspace>,
    project: ProjectId,
    window_size: usize,
    current: Frame,
    new_rows: u64,
}

impl MonitoringService {
    pub fn new(
        template: DriftReport,
        reference: Arc<Frame>,
        engine: Arc<dyn DriftEngine>,
        workspace: Arc<dyn ReportWorkspace>,
        project: ProjectId,
        window_size: usize,
    ) -> MonitorResult<Self> {
        if window_size == 0 {
            return Err(MonitorError::config("window size must be positive"));
        }
        Ok(Self {
            template,
            reference,
            engine,
            workspace,
            project,
            window_size,
            current: Frame::default(),
            new_rows: 0,
        })
    }

    /// Append `new_rows`, trim to the window and report when the window is full.
    ///
    /// Rows stay appended even when the engine or the workspace fails.
    pub fn iterate(&mut self, new_rows: &Frame) -> MonitorResult<IterateOutcome> {
        self.current.append(new_rows);
        self.new_rows += new_rows.len() as u64;

        let current_size = self.current.len();
        if current_size > self.window_size {
            self.current.keep_last(self.window_size);
        }
        if current_size < self.window_size {
            tracing::info!(
                "not enough data for measurement: {current_size} of {}, waiting for more data",
                self.window_size
            );
            return Ok(IterateOutcome::Waiting {
                have: current_size,
                need: self.window_size,
            });
        }

        let mut report = self.template.fresh();
        report.timestamp = Some(time::now());
        tracing::info!(report = %report.id, rows = self.current.len(), "running drift report");
        self.engine.run(&mut report, &self.reference, &self.current)?;
        self.workspace.add_report(&self.project, &report)?;
        Ok(IterateOutcome::Reported {
            report_id: report.id,
        })
    }

    pub fn current(&self) -> &Frame {
        &self.current
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Total rows ever passed to `iterate`.
    pub fn new_rows_seen(&self) -> u64 {
        self.new_rows
    }
}

/// Shared handle that holds one lock across the whole `iterate` body, so at
/// most one call is in flight per accumulator.
#[derive(Clone)]
pub struct SharedMonitor(Arc<Mutex<MonitoringService>>);

impl SharedMonitor {
    pub fn new(service: MonitoringService) -> Self {
        Self(Arc::new(Mutex::new(service)))
    }

    pub fn iterate(&self, new_rows: &Frame) -> MonitorResult<IterateOutcome> {
        self.0.lock().iterate(new_rows)
    }

    /// Read the accumulator state under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&MonitoringService) -> R) -> R {
        let guard = self.0.lock();
        f(&*guard)
    }
}

/// First project with this name, created when none exists.
pub fn resolve_project(workspace: &dyn ReportWorkspace, name: &str) -> MonitorResult<Project> {
    match workspace.search_project(name)?.into_iter().next() {
        Some(project) => Ok(project),
        None => {
            tracing::info!(project = name, "creating report project");
            workspace.create_project(name, PROJECT_DESCRIPTION)
        }
    }
}

/// Run one drift report of `reference` against a batch of features, write it
/// to `report_path` as JSON and add it to the named project.
pub fn detect_drift(
    engine: &dyn DriftEngine,
    workspace: &dyn ReportWorkspace,
    reference: &Frame,
    features: &Frame,
    project_name: &str,
    report_path: &Path,
) -> MonitorResult<DriftReport> {
    let mut current = features.clone();
    current.drop_columns_if_present(&[ENTITY_KEY]);

    let mut report = income_drift_report();
    report.timestamp = Some(time::now());
    engine.run(&mut report, reference, &current)?;

    if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(report_path, serde_json::to_vec_pretty(&report)?)?;
    tracing::info!(path = %report_path.display(), "drift report written");

    let project = resolve_project(workspace, project_name)?;
    workspace.add_report(&project.id, &report)?;
    Ok(report)
}
