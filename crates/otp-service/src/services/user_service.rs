//! Read access to the user directory for API clients.

use crate::errors::OtpError;
use crate::models::{ListUsersResponse, UserResponse};
use crate::repositories::UserRepository;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, OtpError> {
        self.user_repo.get_by_id(id).await.map(UserResponse::from)
    }

    /// One page of users; `page` and `limit` are echoed back.
    #[instrument(skip_all, fields(page = page, limit = limit))]
    pub async fn list_users(
        &self,
        page: usize,
        limit: usize,
        search: Option<&str>,
    ) -> Result<ListUsersResponse, OtpError> {
        let result = self.user_repo.list(page, limit, search).await?;

        Ok(ListUsersResponse {
            users: result.users.into_iter().map(UserResponse::from).collect(),
            total: result.total,
            page,
            limit,
        })
    }
}
