use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bus::{AppEvent, Subscription};
use crate::ids::IdGenerator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub linked_event: Option<u64>,
}

pub struct TaskList<'a> {
    tasks: Vec<Task>,
    ids: &'a dyn IdGenerator,
}

impl<'a> TaskList<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { tasks: Vec::new(), ids }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn add(&mut self, title: impl Into<String>, due_date: Option<NaiveDate>) -> &Task {
        let task = Task {
            id: self.ids.next_id(),
            title: title.into(),
            description: String::new(),
            due_date,
            status: TaskStatus::Todo,
            linked_event: None,
        };
        self.push(task)
    }

    pub fn set_status(&mut self, id: u64, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Reacts to bus events; returns the task created, if any.
    pub fn handle_event(&mut self, event: &AppEvent) -> Option<&Task> {
        let AppEvent::AddEventTask(payload) = event else {
            return None;
        };
        if self.tasks.iter().any(|task| task.linked_event == Some(payload.event_id)) {
            return None;
        }

        let task = Task {
            id: self.ids.next_id(),
            title: payload.title.clone(),
            description: payload.description.clone(),
            due_date: Some(payload.date),
            status: TaskStatus::Todo,
            linked_event: Some(payload.event_id),
        };
        info!(
            event_name = "tasks.linked_task_created",
            task_id = task.id,
            calendar_event_id = payload.event_id,
            "task created from calendar event"
        );
        Some(self.push(task))
    }

    /// Applies every pending event on the subscription, returning how many tasks were created.
    pub fn sync(&mut self, subscription: &mut Subscription) -> usize {
        subscription
            .drain()
            .iter()
            .filter(|event| self.handle_event(event).is_some())
            .count()
    }

    fn push(&mut self, task: Task) -> &Task {
        self.tasks.push(task);
        &self.tasks[self.tasks.len() - 1]
    }
}
