use std::path::Path;

use procura_core::audit::{AuditContext, TracingAuditSink};
use procura_core::errors::ApplicationError;
use procura_core::domain::project::{ColumnId, Project, ProjectId};
use procura_core::kanban::{Column, KanbanBoard, KanbanError};
use serde::Deserialize;

use crate::commands::{
    correlation_id, input_failure, load_config, read_json, write_json, CommandResult,
};

/// Board file as written by hand; columns fall back to the configured ones.
#[derive(Debug, Deserialize)]
struct BoardFile {
    #[serde(default)]
    columns: Option<Vec<Column>>,
    #[serde(default)]
    projects: Vec<Project>,
}

pub fn move_project(file: &Path, project: u64, to: &str) -> CommandResult {
    const COMMAND: &str = "kanban.move";

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let board_file: BoardFile = match read_json(file) {
        Ok(board_file) => board_file,
        Err(error) => return input_failure(COMMAND, error),
    };

    let columns = board_file.columns.unwrap_or_else(|| config.kanban.columns.clone());
    let mut board = match load_board(columns, board_file.projects) {
        Ok(board) => board,
        Err(error) => return rejected(COMMAND, &error),
    };

    let audit = AuditContext::new(None, correlation_id(), "cli");
    let target = ColumnId::new(to);
    let change = board
        .drag_start(ProjectId(project))
        .and_then(|payload| board.drop_with_audit(&payload, &target, &TracingAuditSink, &audit));

    let change = match change {
        Ok(change) => change,
        Err(error) => return rejected(COMMAND, &error),
    };
    if let Err(error) = write_json(file, &board) {
        return input_failure(COMMAND, error);
    }

    let counts = board
        .column_counts()
        .into_iter()
        .map(|(column, count)| format!("{column}={count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let summary = match change.to_event() {
        Some(event) => serde_json::to_string(&event).unwrap_or_default(),
        None => format!("project {} unchanged", change.id()),
    };
    CommandResult::success(COMMAND, format!("{summary}; columns: {counts}"))
}

fn load_board(columns: Vec<Column>, projects: Vec<Project>) -> Result<KanbanBoard, KanbanError> {
    let mut board = KanbanBoard::new(columns);
    for project in projects {
        board.add(project)?;
    }
    Ok(board)
}

fn rejected(command: &str, error: &KanbanError) -> CommandResult {
    CommandResult::rejected(command, "kanban_rejected", ApplicationError::Input(error.to_string()))
}
