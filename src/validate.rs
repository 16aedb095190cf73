//! Client-side form checks run before anything is sent to the API.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::client::{BillDraft, TransactionDraft, TransactionPatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every failing field of one form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }

    fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn check_text(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

fn check_amount(errors: &mut Vec<FieldError>, value: f64) {
    if !value.is_finite() {
        errors.push(FieldError::new("amount", "must be a number"));
    } else if value <= 0.0 {
        errors.push(FieldError::new("amount", "must be greater than 0"));
    }
}

pub fn validate_transaction(draft: &TransactionDraft) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    check_text(&mut errors, "description", &draft.description);
    check_amount(&mut errors, draft.amount);
    check_text(&mut errors, "category", &draft.category);
    if draft.frequency.is_some() && !draft.is_fixed {
        errors.push(FieldError::new(
            "frequency",
            "only applies to fixed transactions",
        ));
    }
    ValidationErrors(errors).into_result()
}

/// Only the fields the patch sets are checked.
pub fn validate_transaction_patch(patch: &TransactionPatch) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if let Some(d) = &patch.description {
        check_text(&mut errors, "description", d);
    }
    if let Some(a) = patch.amount {
        check_amount(&mut errors, a);
    }
    if let Some(c) = &patch.category {
        check_text(&mut errors, "category", c);
    }
    if patch.frequency.is_some() && patch.is_fixed == Some(false) {
        errors.push(FieldError::new(
            "frequency",
            "only applies to fixed transactions",
        ));
    }
    ValidationErrors(errors).into_result()
}

pub fn validate_bill(draft: &BillDraft) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    check_text(&mut errors, "name", &draft.name);
    check_amount(&mut errors, draft.amount);
    match (draft.is_recurring, draft.frequency) {
        (true, None) => errors.push(FieldError::new(
            "frequency",
            "is required for recurring bills",
        )),
        (false, Some(_)) => errors.push(FieldError::new(
            "frequency",
            "only applies to recurring bills",
        )),
        _ => {}
    }
    ValidationErrors(errors).into_result()
}
