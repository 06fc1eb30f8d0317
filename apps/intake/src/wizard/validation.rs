use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::cv::{CvDocument, Personal};
use crate::wizard::machine::Step;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("Full Name is required")]
    FullNameRequired,

    #[error("Valid email is required")]
    EmailInvalid,

    #[error("WhatsApp number is required")]
    WhatsAppRequired,

    #[error("Phone number is required")]
    PhoneRequired,
}

fn email_shape() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("valid email regex"))
}

/// Loose `text@text.text` check; deliverability is the backend's concern.
pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email_shape().is_match(email)
}

/// Every problem with the personal details, in form order.
pub fn personal_errors(personal: &Personal) -> Vec<StepError> {
    let mut errors = Vec::new();
    if personal.full_name.trim().is_empty() {
        errors.push(StepError::FullNameRequired);
    }
    if !is_valid_email(&personal.email) {
        errors.push(StepError::EmailInvalid);
    }
    if personal.whatsapp.trim().is_empty() {
        errors.push(StepError::WhatsAppRequired);
    }
    if !personal.phone_same_as_wa && personal.phone.trim().is_empty() {
        errors.push(StepError::PhoneRequired);
    }
    errors
}

/// Checks the rules gating the given step. Only the personal step has any.
pub fn validate_step(step: Step, document: &CvDocument) -> Result<(), StepError> {
    if step != Step::FIRST {
        return Ok(());
    }
    match personal_errors(&document.personal).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
