use crate::domain::rfq::RfqType;
use crate::flows::WizardStage;
use crate::validation::FieldErrors;
use crate::wizard::draft::RfqDraft;

pub fn validate_stage(draft: &RfqDraft, stage: WizardStage) -> FieldErrors {
    match stage {
        WizardStage::Details => validate_details(draft),
        WizardStage::Terms => validate_terms(draft),
        WizardStage::Vendors => validate_vendors(draft),
    }
}

/// Merged errors for every stage up to and including `last`.
pub fn validate_through(draft: &RfqDraft, last: WizardStage) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for stage in WizardStage::ALL.into_iter().filter(|stage| *stage <= last) {
        errors.merge(validate_stage(draft, stage));
    }
    errors
}

/// Draft saves check stage 1, and stage 2 once the wizard has reached it. Vendor
/// selection is never required for a draft.
pub fn validate_for_draft(draft: &RfqDraft, current: WizardStage) -> FieldErrors {
    validate_through(draft, current.min(WizardStage::Terms))
}

pub fn validate_for_submission(draft: &RfqDraft) -> FieldErrors {
    validate_through(draft, WizardStage::Vendors)
}

fn validate_details(draft: &RfqDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.require_text("title", &draft.title, "RFQ title is required");
    errors.require_text("category", &draft.category, "Category is required");
    errors.require_some("due_date", draft.due_date.as_ref(), "Due date is required");

    match draft.rfq_type {
        RfqType::SingleItem => {
            errors.require_text("item_description", &draft.item.description, "Item description is required");
            errors.require_text("quantity", &draft.item.quantity, "Quantity is required");
        }
        RfqType::MultipleItems => {
            if !draft.items.iter().any(|item| item.is_complete()) {
                errors.insert("items", "Add at least one item with description and quantity");
            }
        }
        RfqType::Services => {
            errors.require_text("description", &draft.description, "Service description is required");
        }
        RfqType::Project => {
            errors.require_text("description", &draft.description, "Project description is required");
        }
    }

    errors
}

fn validate_terms(draft: &RfqDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.require_some("purchase_type", draft.purchase_type.as_ref(), "Purchase type is required");
    errors.require_text("payment_terms", &draft.payment_terms, "Payment terms are required");
    errors.require_some("delivery_date", draft.delivery_date.as_ref(), "Delivery date is required");

    match &draft.new_location {
        Some(address) => {
            errors.require_text("new_location.label", &address.label, "Location name is required");
            errors.require_text("new_location.street", &address.street, "Street address is required");
            errors.require_text("new_location.city", &address.city, "City is required");
            errors.require_text("new_location.postal_code", &address.postal_code, "Postal code is required");
            errors.require_text("new_location.country", &address.country, "Country is required");
        }
        None => {
            errors.require_text("delivery_location", &draft.delivery_location, "Delivery location is required");
        }
    }

    errors
}

fn validate_vendors(draft: &RfqDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if draft.selected_vendors.is_empty() {
        errors.insert("selected_vendors", "Select at least one vendor");
    }
    errors
}
