use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use serde::Serialize;

use super::tour::comparison;
use super::{CrudRepository, RepoError};
use crate::entities::users;
use crate::models::user::{Role, SignupInput, UpdateMeInput, UserUpdate};
use crate::query::ListQuery;
use crate::services::password;

/// User data as returned by the API: no password hash, no reset token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub role: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for PublicUser {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            photo: model.photo,
            role: model.role,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn column_for(field: &str) -> Option<users::Column> {
    match field {
        "name" => Some(users::Column::Name),
        "email" => Some(users::Column::Email),
        "role" => Some(users::Column::Role),
        "createdAt" => Some(users::Column::CreatedAt),
        _ => None,
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn active_only() -> Select<users::Entity> {
        // Soft-deleted users stay out of every default query.
        users::Entity::find().filter(users::Column::Active.eq(true))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<PublicUser>, RepoError> {
        let mut select = Self::active_only();
        for filter in &query.filters {
            if let Some(col) = column_for(&filter.field) {
                select = select.filter(comparison(col, filter));
            }
        }
        for key in &query.sort {
            if let Some(col) = column_for(&key.field) {
                let order = if key.descending { Order::Desc } else { Order::Asc };
                select = select.order_by(col, order);
            }
        }
        let models = select
            .offset(query.offset())
            .limit(query.limit)
            .all(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(models.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<PublicUser>, RepoError> {
        let model = Self::active_only()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(model.map(PublicUser::from))
    }

    /// Full row including credential fields, for the auth path.
    pub async fn get_model(&self, id: i32) -> Result<Option<users::Model>, RepoError> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)
    }

    /// Login lookup; inactive users do not resolve.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>, RepoError> {
        Self::active_only()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .map_err(RepoError::from)
    }

    pub async fn signup(&self, input: SignupInput) -> Result<PublicUser, RepoError> {
        let hash = password::hash(&input.password)
            .await
            .map_err(RepoError::Other)?;
        let now = Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            name: Set(input.name),
            email: Set(input.email.to_lowercase()),
            photo: Set(None),
            // Signup never grants elevated roles.
            role: Set(Role::User.as_str().to_string()),
            password_hash: Set(hash),
            password_changed_at: Set(None),
            password_reset_token: Set(None),
            password_reset_expires: Set(None),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = model.insert(&self.conn).await.map_err(RepoError::from)?;
        Ok(PublicUser::from(model))
    }

    /// Self-service profile update; only name, email, and photo move.
    pub async fn update_me(
        &self,
        id: i32,
        input: UpdateMeInput,
    ) -> Result<Option<PublicUser>, RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email.to_lowercase());
        }
        if let Some(photo) = input.photo {
            active.photo = Set(Some(photo));
        }
        active.updated_at = Set(Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(Some(PublicUser::from(model)))
    }

    pub async fn update(
        &self,
        id: i32,
        input: UserUpdate,
    ) -> Result<Option<PublicUser>, RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email.to_lowercase());
        }
        if let Some(photo) = input.photo {
            active.photo = Set(Some(photo));
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(Some(PublicUser::from(model)))
    }

    /// Soft delete: the row stays, the flag flips.
    pub async fn deactivate(&self, id: i32) -> Result<bool, RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = existing.into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(true)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, RepoError> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(result.rows_affected > 0)
    }

    /// Stores the hashed reset token with its expiry window.
    pub async fn set_reset_token(
        &self,
        id: i32,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<(), RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Err(RepoError::Other(anyhow::anyhow!("User {id} not found")));
        };

        let mut active: users::ActiveModel = existing.into();
        active.password_reset_token = Set(Some(token_hash.to_string()));
        active.password_reset_expires = Set(Some(expires_at.to_string()));
        active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(())
    }

    /// Rollback path when reset-mail delivery fails.
    pub async fn clear_reset_token(&self, id: i32) -> Result<(), RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(());
        };

        let mut active: users::ActiveModel = existing.into();
        active.password_reset_token = Set(None);
        active.password_reset_expires = Set(None);
        active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(())
    }

    pub async fn get_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<users::Model>, RepoError> {
        Self::active_only()
            .filter(users::Column::PasswordResetToken.eq(token_hash))
            .one(&self.conn)
            .await
            .map_err(RepoError::from)
    }

    /// Sets a new password hash, stamps the change time, and burns any
    /// outstanding reset token.
    pub async fn update_password(&self, id: i32, new_password: &str) -> Result<(), RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Err(RepoError::Other(anyhow::anyhow!("User {id} not found")));
        };

        let hash = password::hash(new_password)
            .await
            .map_err(RepoError::Other)?;
        let now = Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = existing.into();
        active.password_hash = Set(hash);
        active.password_changed_at = Set(Some(now.clone()));
        active.password_reset_token = Set(None);
        active.password_reset_expires = Set(None);
        active.updated_at = Set(now);
        active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(())
    }
}

#[async_trait]
impl CrudRepository for UserRepository {
    type Output = PublicUser;
    type Create = SignupInput;
    type Update = UserUpdate;

    async fn find_all(&self, query: &ListQuery) -> Result<Vec<PublicUser>, RepoError> {
        self.list(query).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<PublicUser>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, input: SignupInput) -> Result<PublicUser, RepoError> {
        self.signup(input).await
    }

    async fn update_by_id(
        &self,
        id: i32,
        input: UserUpdate,
    ) -> Result<Option<PublicUser>, RepoError> {
        self.update(id, input).await
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, RepoError> {
        self.delete(id).await
    }
}
