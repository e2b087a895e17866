//! Email acceptance at the service boundary.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ValidationError;

pub const DEFAULT_OVERRIDE_EMAIL: &str = "nitin@ee.iitm.ac.in";

static STUDENT_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}f\d{7}@ds\.study\.iitm\.ac\.in$").expect("email pattern is valid")
});

/// Structured reply for an email check: `{status, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReply {
    pub status: String,
    pub message: String,
}

impl ValidationReply {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Accepts student addresses of the form `NNfNNNNNNN@ds.study.iitm.ac.in`
/// plus one configured override address.
#[derive(Debug, Clone)]
pub struct EmailValidator {
    override_email: String,
}

impl Default for EmailValidator {
    fn default() -> Self {
        Self::new(DEFAULT_OVERRIDE_EMAIL)
    }
}

impl EmailValidator {
    pub fn new(override_email: impl Into<String>) -> Self {
        Self {
            override_email: override_email.into(),
        }
    }

    pub fn validate(&self, email: &str) -> Result<(), ValidationError> {
        if STUDENT_EMAIL.is_match(email) || email == self.override_email {
            Ok(())
        } else {
            Err(ValidationError::InvalidEmail {
                email: email.to_string(),
            })
        }
    }

    /// Boundary form of [`validate`](Self::validate).
    pub fn reply(&self, email: &str) -> ValidationReply {
        match self.validate(email) {
            Ok(()) => {
                info!("Email validated: {email}");
                ValidationReply {
                    status: "success".to_string(),
                    message: "Email validated successfully!".to_string(),
                }
            }
            Err(e) => {
                warn!("{e}");
                ValidationReply {
                    status: "error".to_string(),
                    message: "Invalid email format.".to_string(),
                }
            }
        }
    }
}
