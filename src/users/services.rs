use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{Lookup, User};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn email_taken(email: &str) -> ServiceError {
    ServiceError::Conflict(format!("User with email {} already exists", email))
}

fn no_such_user(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("User not found with id: {}", id))
}

/// Business rules for users on top of a [`UserStore`].
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Lookup, ServiceError> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn create_user(&self, mut draft: User) -> Result<User, ServiceError> {
        draft.id = None;
        if self.store.exists_by_email(&draft.email).await? {
            warn!(email = %draft.email, "create rejected, email taken");
            return Err(email_taken(&draft.email));
        }

        // Another writer may claim the email between the check and the insert.
        let email = draft.email.clone();
        let user = match self.store.save(draft).await {
            Ok(u) => u,
            Err(StoreError::ConstraintViolation(constraint)) => {
                warn!(%constraint, %email, "create lost uniqueness race");
                return Err(email_taken(&email));
            }
            Err(e) => return Err(e.into()),
        };
        info!(user_id = ?user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, draft: User) -> Result<User, ServiceError> {
        let mut user = match self.store.find_by_id(id).await? {
            Lookup::Found(u) => u,
            Lookup::Absent => return Err(no_such_user(id)),
        };

        if user.email != draft.email && self.store.exists_by_email(&draft.email).await? {
            warn!(user_id = id, email = %draft.email, "update rejected, email taken");
            return Err(email_taken(&draft.email));
        }

        user.name = draft.name;
        user.email = draft.email;
        user.address = draft.address;

        let user = self.store.save(user).await?;
        info!(user_id = id, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        let user = match self.store.find_by_id(id).await? {
            Lookup::Found(u) => u,
            Lookup::Absent => return Err(no_such_user(id)),
        };
        self.store.delete(&user).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn health(&self) -> Result<(), ServiceError> {
        self.store.ping().await?;
        debug!("store ping ok");
        Ok(())
    }
}
