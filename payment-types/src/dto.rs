//! Data Transfer Objects (DTOs) for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Response after creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub user_id: UserId,
}

/// Response after a batch initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInitResponse {
    pub msg: String,
}

impl BatchInitResponse {
    pub fn success() -> Self {
        Self {
            msg: "Batch init for users successful".to_string(),
        }
    }
}
