use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{Lookup, User};

/// Process-local store with the same id and uniqueness semantics as `users`.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<Rows>,
}

#[derive(Default)]
struct Rows {
    by_id: BTreeMap<i64, User>,
    last_id: i64,
}

impl Rows {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.by_id
            .values()
            .any(|u| u.email == email && u.id != except)
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Rows> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.rows().by_id.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Lookup, StoreError> {
        Ok(self.rows().by_id.get(&id).cloned().into())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.rows().email_taken(email, None))
    }

    async fn save(&self, mut user: User) -> Result<User, StoreError> {
        let mut rows = self.rows();
        if rows.email_taken(&user.email, user.id) {
            return Err(StoreError::ConstraintViolation("users_email_key".into()));
        }
        let id = match user.id {
            Some(id) if !rows.by_id.contains_key(&id) => return Err(StoreError::NotFound(id)),
            Some(id) => id,
            None => {
                rows.last_id += 1;
                rows.last_id
            }
        };
        user.id = Some(id);
        rows.by_id.insert(id, user.clone());
        Ok(user)
    }

    async fn delete(&self, user: &User) -> Result<(), StoreError> {
        let id = user.id.ok_or(StoreError::MissingId)?;
        match self.rows().by_id.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
