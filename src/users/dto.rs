use serde::{Deserialize, Serialize};

use crate::users::validation::FieldViolation;

/// Request body for create and update. A client-supplied `id` is ignored.
#[derive(Debug, Deserialize)]
pub struct UserDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}
