//! User directory.
//!
//! Users live in process memory: a primary map by id, a unique index by phone
//! number, and the ids in insertion order so listings page stably. All three
//! sit behind one `RwLock`; reads run concurrently, writes are exclusive.

use crate::errors::OtpError;
use crate::models::User;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One page of users plus the size of the filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: usize,
}

/// Create/read/update/list access to registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `UserAlreadyExists` if the phone number
    /// is already bound.
    async fn create(&self, user: User) -> Result<User, OtpError>;

    async fn get_by_id(&self, id: Uuid) -> Result<User, OtpError>;

    async fn get_by_phone_number(&self, phone_number: &str) -> Result<User, OtpError>;

    /// Replace a stored user wholesale. Fails with `UserNotFound` for an
    /// unknown id.
    async fn update(&self, user: User) -> Result<User, OtpError>;

    /// List users in registration order.
    ///
    /// `search` filters by exact phone number. `page` and `limit` must
    /// already be normalized to positive values; a page past the end is
    /// empty, not an error.
    async fn list(
        &self,
        page: usize,
        limit: usize,
        search: Option<&str>,
    ) -> Result<UserPage, OtpError>;
}

#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<Uuid, User>,
    by_phone: HashMap<String, Uuid>,
    order: Vec<Uuid>,
}

/// In-memory [`UserRepository`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Directory>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, OtpError> {
        let mut dir = self.inner.write().await;

        if dir.by_phone.contains_key(&user.phone_number) {
            return Err(OtpError::UserAlreadyExists);
        }
        if dir.by_id.contains_key(&user.id) {
            return Err(OtpError::Internal("Duplicate user id".to_string()));
        }

        dir.by_phone.insert(user.phone_number.clone(), user.id);
        dir.order.push(user.id);
        dir.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, OtpError> {
        let dir = self.inner.read().await;
        dir.by_id.get(&id).cloned().ok_or(OtpError::UserNotFound)
    }

    async fn get_by_phone_number(&self, phone_number: &str) -> Result<User, OtpError> {
        let dir = self.inner.read().await;
        dir.by_phone
            .get(phone_number)
            .and_then(|id| dir.by_id.get(id))
            .cloned()
            .ok_or(OtpError::UserNotFound)
    }

    async fn update(&self, user: User) -> Result<User, OtpError> {
        let mut dir = self.inner.write().await;

        let old_phone = match dir.by_id.get(&user.id) {
            Some(existing) => existing.phone_number.clone(),
            None => return Err(OtpError::UserNotFound),
        };

        // Keep the phone index a bijection if the number changes
        if old_phone != user.phone_number {
            if dir.by_phone.contains_key(&user.phone_number) {
                return Err(OtpError::UserAlreadyExists);
            }
            dir.by_phone.remove(&old_phone);
            dir.by_phone.insert(user.phone_number.clone(), user.id);
        }

        dir.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list(
        &self,
        page: usize,
        limit: usize,
        search: Option<&str>,
    ) -> Result<UserPage, OtpError> {
        let dir = self.inner.read().await;

        if let Some(phone_number) = search {
            // Phone numbers are unique, so an exact match yields 0 or 1 users
            let matched: Vec<User> = dir
                .by_phone
                .get(phone_number)
                .and_then(|id| dir.by_id.get(id))
                .cloned()
                .into_iter()
                .collect();
            let total = matched.len();
            let users = paginate(matched.into_iter(), page, limit);
            return Ok(UserPage { users, total });
        }

        let total = dir.order.len();
        let users = paginate(
            dir.order.iter().filter_map(|id| dir.by_id.get(id)).cloned(),
            page,
            limit,
        );
        Ok(UserPage { users, total })
    }
}

fn paginate(users: impl Iterator<Item = User>, page: usize, limit: usize) -> Vec<User> {
    let start = page.saturating_sub(1).saturating_mul(limit);
    users.skip(start).take(limit).collect()
}
