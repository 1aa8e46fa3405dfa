use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::bus::AppEvent;
use crate::domain::project::{ColumnId, Project, ProjectId, ProjectPatch};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KanbanError {
    #[error("project {0} is not on the board")]
    UnknownProject(ProjectId),
    #[error("column `{0}` does not exist")]
    UnknownColumn(ColumnId),
    #[error("project {0} is already on the board")]
    DuplicateProject(ProjectId),
    #[error("drag payload could not be read: {0}")]
    MalformedPayload(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: ColumnId::new(id), title: title.into() }
    }
}

pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new("planning", "Planning"),
        Column::new("in-progress", "In Progress"),
        Column::new("review", "Review"),
        Column::new("completed", "Completed"),
    ]
}

/// Serialized project carried from drag start to drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragPayload(pub String);

impl DragPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ProjectChange {
    Added { id: ProjectId },
    Updated { id: ProjectId },
    Moved { id: ProjectId, from: ColumnId, to: ColumnId },
    Deleted { id: ProjectId },
}

impl ProjectChange {
    pub fn id(&self) -> ProjectId {
        match self {
            Self::Added { id } | Self::Updated { id } | Self::Moved { id, .. } | Self::Deleted { id } => *id,
        }
    }

    pub fn to_event(&self) -> Option<AppEvent> {
        match self {
            Self::Moved { id, from, to } => {
                Some(AppEvent::ProjectMoved { id: *id, from: from.clone(), to: to.clone() })
            }
            _ => None,
        }
    }
}

/// Blocking yes/no question asked before destructive actions.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Projects grouped into status columns. Column membership is the project status;
/// order within a column is insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanBoard {
    #[serde(default = "default_columns")]
    columns: Vec<Column>,
    #[serde(default)]
    projects: Vec<Project>,
}

impl Default for KanbanBoard {
    fn default() -> Self {
        Self::new(default_columns())
    }
}

impl KanbanBoard {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, projects: Vec::new() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn has_column(&self, id: &ColumnId) -> bool {
        self.columns.iter().any(|column| &column.id == id)
    }

    pub fn column(&self, id: &ColumnId) -> Vec<&Project> {
        self.projects.iter().filter(|project| &project.status == id).collect()
    }

    pub fn column_counts(&self) -> Vec<(ColumnId, usize)> {
        self.columns.iter().map(|column| (column.id.clone(), self.column(&column.id).len())).collect()
    }

    pub fn add(&mut self, project: Project) -> Result<ProjectChange, KanbanError> {
        if self.get(project.id).is_some() {
            return Err(KanbanError::DuplicateProject(project.id));
        }
        self.ensure_column(&project.status)?;

        let id = project.id;
        self.projects.push(project);
        Ok(ProjectChange::Added { id })
    }

    pub fn update(&mut self, id: ProjectId, patch: ProjectPatch) -> Result<ProjectChange, KanbanError> {
        if let Some(status) = &patch.status {
            self.ensure_column(status)?;
        }
        let project = self.project_mut(id)?;
        let from = project.status.clone();
        project.apply(patch);

        if project.status != from {
            return Ok(ProjectChange::Moved { id, from, to: project.status.clone() });
        }
        Ok(ProjectChange::Updated { id })
    }

    pub fn drag_start(&self, id: ProjectId) -> Result<DragPayload, KanbanError> {
        let project = self.get(id).ok_or(KanbanError::UnknownProject(id))?;
        serde_json::to_string(project)
            .map(DragPayload)
            .map_err(|error| KanbanError::MalformedPayload(error.to_string()))
    }

    /// Moves the dragged project into `column`; no other project is touched.
    pub fn drop(&mut self, payload: &DragPayload, column: &ColumnId) -> Result<ProjectChange, KanbanError> {
        let dragged: Project = serde_json::from_str(payload.as_str())
            .map_err(|error| KanbanError::MalformedPayload(error.to_string()))?;
        self.ensure_column(column)?;

        let change = self.update(dragged.id, ProjectPatch { status: Some(column.clone()), ..ProjectPatch::default() })?;
        info!(
            event_name = "kanban.project_dropped",
            project_id = %dragged.id,
            column = %column,
            "project dropped on column"
        );
        Ok(change)
    }

    pub fn drop_with_audit<S>(
        &mut self,
        payload: &DragPayload,
        column: &ColumnId,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<ProjectChange, KanbanError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.drop(payload, column);
        let event = match &result {
            Ok(change) => AuditEvent::new(
                &audit.with_subject(change.id().to_string()),
                "kanban.project_moved",
                AuditCategory::Kanban,
                AuditOutcome::Success,
            )
            .with_metadata("to", column.as_str()),
            Err(error) => {
                let outcome = match error {
                    KanbanError::MalformedPayload(_) => AuditOutcome::Failed,
                    _ => AuditOutcome::Rejected,
                };
                AuditEvent::new(audit, "kanban.drop_rejected", AuditCategory::Kanban, outcome)
                    .with_metadata("error", error.to_string())
            }
        };
        sink.emit(event);
        result
    }

    /// Removes a project after confirmation. A declined prompt leaves the board unchanged.
    pub fn delete<P>(&mut self, id: ProjectId, prompt: &P) -> Result<Option<ProjectChange>, KanbanError>
    where
        P: ConfirmPrompt + ?Sized,
    {
        let position = self
            .projects
            .iter()
            .position(|project| project.id == id)
            .ok_or(KanbanError::UnknownProject(id))?;

        let message = format!("Delete project \"{}\"?", self.projects[position].name);
        if !prompt.confirm(&message) {
            return Ok(None);
        }

        self.projects.remove(position);
        info!(event_name = "kanban.project_deleted", project_id = %id, "project deleted");
        Ok(Some(ProjectChange::Deleted { id }))
    }

    fn ensure_column(&self, column: &ColumnId) -> Result<(), KanbanError> {
        if self.has_column(column) {
            return Ok(());
        }
        Err(KanbanError::UnknownColumn(column.clone()))
    }

    fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project, KanbanError> {
        self.projects.iter_mut().find(|project| project.id == id).ok_or(KanbanError::UnknownProject(id))
    }
}
