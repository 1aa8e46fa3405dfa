use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{Days, NaiveDate, Utc};
use procura_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
use procura_core::bus::{AppEvent, EventBus, EventTopic};
use procura_core::calendar::{Calendar, NewCalendarEvent};
use procura_core::config::AppConfig;
use procura_core::domain::project::{ColumnId, Project, ProjectId};
use procura_core::domain::rfq::{Priority, PurchaseType, RfqItem, RfqType};
use procura_core::domain::vendor::{VendorDirectory, VendorId};
use procura_core::kanban::KanbanBoard;
use procura_core::scheduler::Scheduler;
use procura_core::tasks::TaskList;
use procura_core::wizard::{RfqCreateModal, RfqDraft, RfqWizard};
use procura_core::RfqBook;
use tracing::info;

use crate::commands::rfq::id_generator;
use crate::commands::{load_config, CommandResult, EXIT_REJECTED, EXIT_RUNTIME};

pub fn run() -> CommandResult {
    const COMMAND: &str = "demo";

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to build tokio runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    match runtime.block_on(scenario(&config)) {
        Ok(lines) => CommandResult::success(COMMAND, lines.join("\n")),
        Err(error) => {
            CommandResult::failure(COMMAND, "demo_failed", format!("{error:#}"), EXIT_REJECTED)
        }
    }
}

async fn scenario(config: &AppConfig) -> anyhow::Result<Vec<String>> {
    let ids = id_generator(config);
    let directory = VendorDirectory::mock();
    let bus = EventBus::new(config.bus.capacity);
    let audit = InMemoryAuditSink::default();
    let context = AuditContext::new(None, "demo", "demo-operator");

    let mut task_feed = bus.subscribe_to([EventTopic::AddEventTask]);
    let mut modal_requests = bus.subscribe_to([EventTopic::OpenCreateRfqModal]);
    let mut activity = bus.subscribe_to([EventTopic::RfqSaved, EventTopic::ProjectMoved]);
    let mut lines = Vec::new();

    let today = Utc::now().date_naive();
    let in_days = |days: u64| today.checked_add_days(Days::new(days)).unwrap_or(today);

    let mut calendar = Calendar::new(&ids, bus.clone());
    let mut tasks = TaskList::new(&ids);
    let event = calendar
        .create_event(NewCalendarEvent {
            title: "Vendor shortlist review".to_owned(),
            date: Some(in_days(3)),
            time: Some("10:00".to_owned()),
            description: "Agree the laptop shortlist".to_owned(),
            create_task: true,
        })
        .map_err(|errors| anyhow!("calendar event rejected: {:?}", errors.fields()))?;
    let created = tasks.sync(&mut task_feed);
    lines.push(format!("calendar event {} created {created} linked task(s)", event.id));

    bus.publish(AppEvent::OpenCreateRfqModal { category: Some("IT Equipment".to_owned()) });
    let request = modal_requests.try_next().context("create-rfq request was not delivered")?;
    let draft = RfqDraft::from_open_request(&request).context("unexpected modal request")?;
    let draft = laptop_request(draft, in_days(14));

    let wizard = RfqWizard::with_draft(draft, &ids, &directory).with_audit(&audit, context.clone());
    let scheduler = Scheduler::current().context("scheduler requires a tokio runtime")?;
    let close_delay = config.wizard.success_close_delay();
    let mut modal = RfqCreateModal::open(wizard, scheduler, close_delay).with_bus(bus.clone());
    modal.wizard_mut().next()?;
    modal.wizard_mut().next()?;

    let mut book = RfqBook::new();
    let rfq_id = modal.send_invite(&mut book)?;
    lines.push(format!(
        "{rfq_id} sent; modal open={} closing in {}ms",
        modal.is_open(),
        close_delay.as_millis()
    ));

    tokio::time::sleep(close_delay + Duration::from_millis(50)).await;
    lines.push(format!("modal open after delay={}", modal.is_open()));

    let mut board = KanbanBoard::new(config.kanban.columns.clone());
    let first = board.columns().first().map(|column| column.id.clone()).context("no columns")?;
    let second = board.columns().get(1).map(|column| column.id.clone()).unwrap_or(first.clone());
    board.add(project(1, "Warehouse fit-out", first.clone()))?;
    board.add(project(2, "Laptop refresh", first))?;

    let payload = board.drag_start(ProjectId(2))?;
    let change = board.drop_with_audit(&payload, &second, &audit, &context)?;
    if let Some(event) = change.to_event() {
        bus.publish(event);
    }
    lines.push(format!("project {} now in `{second}`", change.id()));

    let activity = activity.drain();
    audit.emit(
        AuditEvent::new(&context, "demo.completed", AuditCategory::System, AuditOutcome::Success)
            .with_metadata("activity_events", activity.len().to_string()),
    );
    info!(
        event_name = "cli.demo_completed",
        published = activity.len(),
        audit_events = audit.events().len(),
        "demo scenario completed"
    );
    lines.push(format!(
        "bus delivered {} activity event(s); {} audit event(s) recorded",
        activity.len(),
        audit.events().len()
    ));

    Ok(lines)
}

fn laptop_request(mut draft: RfqDraft, due_date: NaiveDate) -> RfqDraft {
    draft.title = "Laptops Q3".to_owned();
    draft.priority = Priority::High;
    draft.due_date = Some(due_date);
    draft.rfq_type = RfqType::SingleItem;
    draft.item =
        RfqItem { description: "14\" business laptop".to_owned(), quantity: "50".to_owned(), unit: "pcs".to_owned() };
    draft.purchase_type = Some(PurchaseType::OneTime);
    draft.payment_terms = "Net 30".to_owned();
    draft.delivery_date = Some(due_date);
    draft.delivery_location = "Main Warehouse".to_owned();
    draft.toggle_vendor(VendorId(1));
    draft.toggle_vendor(VendorId(5));
    draft.invite_email("sales@newvendor.example");
    draft
}

fn project(id: u64, name: &str, status: ColumnId) -> Project {
    Project {
        id: ProjectId(id),
        name: name.to_owned(),
        description: String::new(),
        status,
        priority: Priority::Medium,
        owner: "procurement".to_owned(),
        due_date: None,
        progress: 0,
    }
}
