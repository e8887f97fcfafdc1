//! Domain types and explicit validation, decoupled from persistence.
//!
//! Validators run at the create/update entry points and return a structured
//! list of field errors instead of relying on schema hooks.

pub mod review;
pub mod tour;
pub mod user;

use serde::Serialize;

pub use review::{ReviewInput, ReviewUpdate};
pub use tour::{Difficulty, GeoPoint, TourInput, TourUpdate, Waypoint};
pub use user::{Role, SignupInput, UpdateMeInput, UserUpdate};

/// A single validation failure tied to an input field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validation contract for request inputs.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Joins field errors into a single operational error message.
#[must_use]
pub fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(". ")
}
