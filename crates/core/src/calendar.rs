use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bus::{AppEvent, EventBus, EventTaskPayload};
use crate::ids::IdGenerator;
use crate::validation::FieldErrors;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: u64,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Ask the task list to create a linked task.
    #[serde(default)]
    pub create_task: bool,
}

/// Only the part of the calendar that feeds the task list.
pub struct Calendar<'a> {
    events: Vec<CalendarEvent>,
    ids: &'a dyn IdGenerator,
    bus: EventBus,
}

impl<'a> Calendar<'a> {
    pub fn new(ids: &'a dyn IdGenerator, bus: EventBus) -> Self {
        Self { events: Vec::new(), ids, bus }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn create_event(&mut self, input: NewCalendarEvent) -> Result<CalendarEvent, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require_text("title", &input.title, "Event title is required");
        errors.require_some("date", input.date.as_ref(), "Event date is required");
        let Some(date) = input.date.filter(|_| errors.is_valid()) else {
            return Err(errors);
        };

        let event = CalendarEvent {
            id: self.ids.next_id(),
            title: input.title.trim().to_owned(),
            date,
            time: input.time,
            description: input.description,
        };
        self.events.push(event.clone());

        if input.create_task {
            let delivered = self.bus.publish(AppEvent::AddEventTask(EventTaskPayload {
                event_id: event.id,
                title: event.title.clone(),
                date: event.date,
                time: event.time.clone(),
                description: event.description.clone(),
            }));
            info!(
                event_name = "calendar.event_task_requested",
                calendar_event_id = event.id,
                delivered,
                "linked task requested"
            );
        }

        Ok(event)
    }
}
