//! Input validation
//!
//! Field checks accumulate into a `ValidationResult`, which converts into a
//! single `InvalidInput` error listing every failed field.

use std::fmt;

use ledger_shim::composite_key::{MAX_UNICODE_RUNE, MIN_UNICODE_RUNE};
use serde::{Deserialize, Serialize};

use crate::error::{ChaincodeError, ChaincodeResult};

/// Validation error with detailed context
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: ValidationErrorCode,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationErrorCode {
    Required,
    InvalidCharacters,
    InvalidReference,
    Mismatch,
    OutOfRange,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({:?})", self.field, self.message, self.code)
    }
}

/// Validation result that can accumulate multiple errors
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, field: &str, message: &str, code: ValidationErrorCode) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
            code,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> ChaincodeResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            Err(ChaincodeError::InvalidInput(format!(
                "validation failed: {}",
                messages.join("; ")
            )))
        }
    }

    /// Identifiers must be non-empty and usable as composite-key parts
    pub fn check_identifier(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.add_error(field, "is required", ValidationErrorCode::Required);
        } else if value.contains(MIN_UNICODE_RUNE) || value.contains(MAX_UNICODE_RUNE) {
            self.add_error(
                field,
                "must not contain U+0000 or U+10FFFF",
                ValidationErrorCode::InvalidCharacters,
            );
        }
    }

    pub fn check_optional_identifier(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.check_identifier(field, value);
        }
    }

    pub fn check_equals<T: PartialEq + fmt::Display>(&mut self, field: &str, actual: T, expected: T) {
        if actual != expected {
            self.add_error(
                field,
                &format!("expected {}, got {}", expected, actual),
                ValidationErrorCode::Mismatch,
            );
        }
    }
}

/// Validate a single identifier
pub fn require_identifier(field: &str, value: &str) -> ChaincodeResult<()> {
    let mut result = ValidationResult::new();
    result.check_identifier(field, value);
    result.into_result()
}
