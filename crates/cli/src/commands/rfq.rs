use std::path::Path;

use procura_core::config::AppConfig;
use procura_core::errors::ApplicationError;
use procura_core::flows::WizardStage;
use procura_core::ids::MonotonicIds;
use procura_core::wizard::{validate_for_submission, validate_stage, validate_through, RfqWizard};
use procura_core::{FieldErrors, RfqDraft, VendorDirectory, WizardError};
use tracing::info;

use crate::commands::{input_failure, load_config, read_json, CommandResult, EXIT_INPUT, EXIT_REJECTED};

pub fn validate(file: &Path, stage: Option<u8>) -> CommandResult {
    const COMMAND: &str = "rfq.validate";

    let draft: RfqDraft = match read_json(file) {
        Ok(draft) => draft,
        Err(error) => return input_failure(COMMAND, error),
    };

    let (errors, last) = match stage {
        None => (validate_for_submission(&draft), WizardStage::Vendors),
        Some(number) => match WizardStage::from_number(number) {
            Some(last) => (validate_through(&draft, last), last),
            None => {
                return CommandResult::failure(
                    COMMAND,
                    "input",
                    format!("stage must be 1, 2 or 3 (got {number})"),
                    EXIT_INPUT,
                )
            }
        },
    };

    if errors.is_valid() {
        CommandResult::success(COMMAND, format!("draft is valid through stage {}", last.number()))
    } else {
        validation_failure(COMMAND, &errors)
    }
}

/// Walks the draft through the wizard. A plain submit must clear every stage
/// and sends invitations; `--draft` stops at the last complete stage and saves.
pub fn submit(file: &Path, save_as_draft: bool) -> CommandResult {
    const COMMAND: &str = "rfq.submit";

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let draft: RfqDraft = match read_json(file) {
        Ok(draft) => draft,
        Err(error) => return input_failure(COMMAND, error),
    };

    let ids = id_generator(&config);
    let directory = VendorDirectory::mock();
    let mut wizard = RfqWizard::with_draft(draft, &ids, &directory);

    let submission = if save_as_draft {
        advance_while_complete(&mut wizard);
        wizard.save_draft()
    } else {
        advance_to_vendors(&mut wizard).and_then(|()| wizard.send_invite())
    };

    match submission {
        Ok(submission) => {
            let rfq = submission.rfq;
            info!(
                event_name = "cli.rfq_submitted",
                rfq_id = %rfq.id,
                status = %rfq.status,
                "rfq submitted from file"
            );
            CommandResult::success(
                COMMAND,
                format!(
                    "{} saved as {} with {} invited vendor(s)",
                    rfq.id,
                    rfq.status,
                    rfq.invited_vendors.len()
                ),
            )
        }
        Err(WizardError::Validation(errors)) => validation_failure(COMMAND, &errors),
        Err(WizardError::Flow(error)) => {
            CommandResult::failure(COMMAND, "flow_rejected", error.to_string(), EXIT_REJECTED)
        }
        Err(WizardError::Domain(error)) => {
            CommandResult::rejected(COMMAND, "domain_rejected", ApplicationError::from(error))
        }
    }
}

pub(crate) fn id_generator(config: &AppConfig) -> MonotonicIds {
    match config.ids.start {
        Some(start) => MonotonicIds::starting_at(start),
        None => MonotonicIds::from_clock(),
    }
}

fn advance_to_vendors(wizard: &mut RfqWizard<'_>) -> Result<(), WizardError> {
    while wizard.current_stage().is_some_and(|stage| stage < WizardStage::Vendors) {
        wizard.next()?;
    }
    Ok(())
}

fn advance_while_complete(wizard: &mut RfqWizard<'_>) {
    while let Some(upcoming) = wizard.current_stage().and_then(|stage| stage.next()) {
        if !validate_stage(wizard.draft(), upcoming).is_valid() || wizard.next().is_err() {
            break;
        }
    }
}

fn validation_failure(command: &str, errors: &FieldErrors) -> CommandResult {
    let message = serde_json::to_string(errors)
        .unwrap_or_else(|_| format!("invalid fields: {}", errors.fields().join(", ")));
    CommandResult::failure(command, "validation", message, EXIT_REJECTED)
}
