use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Forbidden),
        }
    }
}

/// Only the owner of a resource may change or delete it.
pub fn can_mutate(actor_id: &str, owner_id: &str) -> Decision {
    if actor_id == owner_id {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
