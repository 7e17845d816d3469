//! Filesystem report workspace.
//!
//! Layout: `<root>/projects.json` holds the project list, reports land in
//! `<root>/reports/<project_id>/<report_id>.json`.

use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::common::config::AppCfg;
use crate::common::error::{MonitorError, MonitorResult};

use super::domain::{DriftReport, Project, ProjectId, ReportWorkspace};

pub struct FsReportWorkspace {
    root: PathBuf,
    projects_lock: Mutex<()>,
}

impl FsReportWorkspace {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.workspace_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            projects_lock: Mutex::new(()),
        }
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    fn report_dir(&self, project: &ProjectId) -> PathBuf {
        self.root.join("reports").join(project.as_str())
    }

    fn load_projects(&self) -> MonitorResult<Vec<Project>> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Stored reports for a project, oldest file name first.
    pub fn list_reports(&self, project: &ProjectId) -> MonitorResult<Vec<DriftReport>> {
        let dir = self.report_dir(project);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();
        paths
            .into_iter()
            .map(|p| -> MonitorResult<DriftReport> { Ok(serde_json::from_slice(&fs::read(p)?)?) })
            .collect()
    }
}

impl ReportWorkspace for FsReportWorkspace {
    fn add_report(&self, project: &ProjectId, report: &DriftReport) -> MonitorResult<()> {
        let known = self.load_projects()?.iter().any(|p| &p.id == project);
        if !known {
            return Err(MonitorError::config(format!(
                "project {} does not exist in the report workspace",
                project.as_str()
            )));
        }
        let dir = self.report_dir(project);
        fs::create_dir_all(&dir)?;
        let stamp = report
            .timestamp
            .map(|ts| ts.format("%Y%m%dT%H%M%S%.6f").to_string())
            .unwrap_or_else(|| "unstamped".to_string());
        let path = dir.join(format!("{stamp}-{}.json", report.id));
        fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        tracing::info!(project = project.as_str(), report = %report.id, "report stored");
        Ok(())
    }

    fn search_project(&self, name: &str) -> MonitorResult<Vec<Project>> {
        Ok(self
            .load_projects()?
            .into_iter()
            .filter(|p| p.name == name)
            .collect())
    }

    fn create_project(&self, name: &str, description: &str) -> MonitorResult<Project> {
        let _guard = self.projects_lock.lock();
        let mut projects = self.load_projects()?;
        let project = Project {
            id: ProjectId::new(Uuid::new_v4().to_string()),
            name: name.to_string(),
            description: description.to_string(),
        };
        projects.push(project.clone());
        fs::create_dir_all(&self.root)?;
        fs::write(self.projects_path(), serde_json::to_vec_pretty(&projects)?)?;
        Ok(project)
    }
}
