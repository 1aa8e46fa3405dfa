pub mod audit;
pub mod book;
pub mod bus;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod ids;
pub mod kanban;
pub mod scheduler;
pub mod selection;
pub mod tasks;
pub mod validation;
pub mod wizard;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use book::{RfqBook, RfqSink, RfqSort, TabCounts};
pub use bus::{AppEvent, EventBus, EventTaskPayload, EventTopic, Subscription};
pub use calendar::{Calendar, CalendarEvent, NewCalendarEvent};
pub use domain::project::{ColumnId, Project, ProjectId, ProjectPatch};
pub use domain::rfq::{Priority, Rfq, RfqId, RfqStatus, RfqType};
pub use domain::vendor::{Vendor, VendorDirectory, VendorId, VendorSnapshot};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ids::{IdGenerator, MonotonicIds};
pub use kanban::{Column, ConfirmPrompt, KanbanBoard, KanbanError, ProjectChange};
pub use scheduler::{ScheduledTask, Scheduler, SchedulerError};
pub use selection::SelectionSet;
pub use tasks::{Task, TaskList, TaskStatus};
pub use validation::FieldErrors;
pub use wizard::{RfqCreateModal, RfqDraft, RfqWizard, WizardError};
