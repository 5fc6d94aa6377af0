//! Input validation for admin requests
//!
//! Patch bodies are validated in full before anything is written: every
//! failing entry is collected and the request is rejected as a whole.

use std::collections::HashMap;

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;

use corral_core::{is_grantable, Entity, GroupId, Kind, Relation};

use crate::dto::{ApiFailure, EntityEntitlement};

pub const MAX_NAME_LENGTH: usize = 255;

/// User name with an optional `@domain` suffix
static IDENTITY_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.+-]*[a-zA-Z0-9](@[a-zA-Z0-9][a-zA-Z0-9.-]*[a-zA-Z0-9])?$")
        .unwrap()
});

static GROUP_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*[a-zA-Z0-9]$").unwrap());

/// Cloud names follow the same shape as group names
static CLOUD_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// Validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str, code: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            code: code.to_string(),
        }
    }
}

/// Validation result
pub type ValidationResult = Result<(), Vec<ValidationError>>;

impl From<Vec<ValidationError>> for ApiFailure {
    fn from(errors: Vec<ValidationError>) -> Self {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        let details: HashMap<String, String> = errors
            .into_iter()
            .map(|e| (e.field, e.code))
            .collect();
        ApiFailure::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(details)
    }
}

/// Input validator
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate and return result
    pub fn validate(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Add an error
    pub fn error(&mut self, field: &str, message: &str, code: &str) -> &mut Self {
        self.errors.push(ValidationError::new(field, message, code));
        self
    }

    /// Validate an identity name such as `alice` or `alice@canonical.com`
    pub fn identity_name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.error(field, "Identity name is required", "required");
        } else if value.len() > MAX_NAME_LENGTH {
            self.error(field, "Identity name is too long", "too_long");
        } else if !IDENTITY_NAME_REGEX.is_match(value) {
            self.error(field, "Invalid identity name", "invalid_format");
        }
        self
    }

    /// Validate a group name
    pub fn group_name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.error(field, "Group name is required", "required");
        } else if value.len() > MAX_NAME_LENGTH {
            self.error(field, "Group name is too long", "too_long");
        } else if !GROUP_NAME_REGEX.is_match(value) {
            self.error(
                field,
                "Group name must be alphanumeric with '.', '_' or '-' inside",
                "invalid_format",
            );
        }
        self
    }

    /// Validate UUID format
    pub fn uuid(&mut self, field: &str, value: &str) -> &mut Self {
        if !UUID_REGEX.is_match(&value.to_lowercase()) {
            self.error(field, "Invalid UUID format", "invalid_format");
        }
        self
    }

    /// Parse a group id, recording an error when it is malformed
    pub fn group_id(&mut self, field: &str, value: &str) -> Option<GroupId> {
        match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                self.error(field, "Invalid group id", "invalid_format");
                None
            }
        }
    }

    /// Check an entitlement against the grantable schema and return the
    /// relation and resource it names
    pub fn entitlement(
        &mut self,
        field: &str,
        value: &EntityEntitlement,
    ) -> Option<(Relation, Entity)> {
        let kind: Kind = match value.entity_type.parse() {
            Ok(kind) => kind,
            Err(_) => {
                self.error(field, "Unknown entity type", "invalid_entity_type");
                return None;
            }
        };
        let relation: Relation = match value.entitlement.parse() {
            Ok(relation) => relation,
            Err(_) => {
                self.error(field, "Unknown entitlement", "invalid_entitlement");
                return None;
            }
        };
        if !is_grantable(kind, relation) {
            self.error(
                field,
                &format!("{} cannot be granted on {}", relation, kind),
                "not_grantable",
            );
            return None;
        }

        let before = self.errors.len();
        match kind {
            Kind::Controller | Kind::Model | Kind::ApplicationOffer | Kind::Group => {
                self.uuid(field, &value.entity_id);
            }
            Kind::Cloud => {
                if !CLOUD_NAME_REGEX.is_match(&value.entity_id) {
                    self.error(field, "Invalid cloud name", "invalid_format");
                }
            }
            Kind::ServiceAccount | Kind::User => {
                self.identity_name(field, &value.entity_id);
            }
        }
        if self.errors.len() > before {
            return None;
        }
        Some((relation, Entity::new(kind, value.entity_id.clone())))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Field label for the `index`th entry of a patch body
pub fn patch_field(index: usize, name: &str) -> String {
    format!("patches[{}].{}", index, name)
}
