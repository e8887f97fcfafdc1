use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    Order, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;

use super::tour::comparison;
use super::{CrudRepository, RepoError};
use crate::entities::{reviews, tours, users};
use crate::models::review::{ReviewInput, ReviewUpdate};
use crate::query::ListQuery;

/// Just enough of the author to render a review.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: i32,
    pub review: String,
    pub rating: f64,
    pub created_at: String,
    pub tour: i32,
    /// Author populated on reads; None if the row was orphaned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl ReviewRecord {
    fn from_pair(model: reviews::Model, author: Option<users::Model>) -> Self {
        Self {
            id: model.id,
            review: model.review,
            rating: model.rating,
            created_at: model.created_at,
            tour: model.tour_id,
            user: author.map(|u| UserSummary {
                id: u.id,
                name: u.name,
                photo: u.photo,
            }),
        }
    }
}

fn column_for(field: &str) -> Option<reviews::Column> {
    match field {
        "rating" => Some(reviews::Column::Rating),
        "tour" => Some(reviews::Column::TourId),
        "user" => Some(reviews::Column::UserId),
        "createdAt" => Some(reviews::Column::CreatedAt),
        _ => None,
    }
}

/// Recomputes the denormalized rating columns on the parent tour. Runs
/// inside the same transaction as the review write, so concurrent writes
/// cannot leave the aggregates stale.
async fn recompute_ratings<C: ConnectionTrait>(conn: &C, tour_id: i32) -> Result<(), RepoError> {
    let ratings: Vec<f64> = reviews::Entity::find()
        .filter(reviews::Column::TourId.eq(tour_id))
        .all(conn)
        .await
        .map_err(RepoError::from)?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let (average, quantity) = if ratings.is_empty() {
        // Back to the defaults a fresh tour starts with.
        (4.5, 0)
    } else {
        let sum: f64 = ratings.iter().sum();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let count = ratings.len() as i32;
        (sum / f64::from(count), count)
    };

    let Some(tour) = tours::Entity::find_by_id(tour_id)
        .one(conn)
        .await
        .map_err(RepoError::from)?
    else {
        return Ok(());
    };

    let mut active: tours::ActiveModel = tour.into();
    active.ratings_average = Set(average);
    active.ratings_quantity = Set(quantity);
    active.update(conn).await.map_err(RepoError::from)?;
    Ok(())
}

pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<ReviewRecord>, RepoError> {
        let mut select = reviews::Entity::find();
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
        let pairs = select
            .find_also_related(users::Entity)
            .offset(query.offset())
            .limit(query.limit)
            .all(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(pairs
            .into_iter()
            .map(|(review, author)| ReviewRecord::from_pair(review, author))
            .collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<ReviewRecord>, RepoError> {
        let pair = reviews::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(pair.map(|(review, author)| ReviewRecord::from_pair(review, author)))
    }

    /// Bare row without the author join, for ownership checks.
    pub async fn get_model(&self, id: i32) -> Result<Option<reviews::Model>, RepoError> {
        reviews::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)
    }

    pub async fn insert(&self, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        let Some(tour_id) = input.tour else {
            return Err(RepoError::Validation(
                "A review must have a tour associated".to_string(),
            ));
        };
        let Some(user_id) = input.user else {
            return Err(RepoError::Validation(
                "A review must have a user associated".to_string(),
            ));
        };

        if tours::Entity::find_by_id(tour_id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?
            .is_none()
        {
            return Err(RepoError::Validation(format!(
                "No tour found with ID {tour_id}"
            )));
        }

        let txn = self.conn.begin().await.map_err(RepoError::from)?;

        let model = reviews::ActiveModel {
            review: Set(input.review),
            rating: Set(input.rating),
            created_at: Set(Utc::now().to_rfc3339()),
            tour_id: Set(tour_id),
            user_id: Set(user_id),
            ..Default::default()
        };
        let model = model.insert(&txn).await.map_err(RepoError::from)?;

        recompute_ratings(&txn, tour_id).await?;
        txn.commit().await.map_err(RepoError::from)?;

        let author = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(ReviewRecord::from_pair(model, author))
    }

    pub async fn update(
        &self,
        id: i32,
        input: ReviewUpdate,
    ) -> Result<Option<ReviewRecord>, RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(None);
        };
        let tour_id = existing.tour_id;

        let txn = self.conn.begin().await.map_err(RepoError::from)?;

        let mut active: reviews::ActiveModel = existing.into();
        if let Some(review) = input.review {
            active.review = Set(review);
        }
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        let model = active.update(&txn).await.map_err(RepoError::from)?;

        recompute_ratings(&txn, tour_id).await?;
        txn.commit().await.map_err(RepoError::from)?;

        let author = users::Entity::find_by_id(model.user_id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(Some(ReviewRecord::from_pair(model, author)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool, RepoError> {
        let Some(existing) = self.get_model(id).await? else {
            return Ok(false);
        };
        let tour_id = existing.tour_id;

        let txn = self.conn.begin().await.map_err(RepoError::from)?;
        existing.delete(&txn).await.map_err(RepoError::from)?;
        recompute_ratings(&txn, tour_id).await?;
        txn.commit().await.map_err(RepoError::from)?;
        Ok(true)
    }
}

#[async_trait]
impl CrudRepository for ReviewRepository {
    type Output = ReviewRecord;
    type Create = ReviewInput;
    type Update = ReviewUpdate;

    async fn find_all(&self, query: &ListQuery) -> Result<Vec<ReviewRecord>, RepoError> {
        self.list(query).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<ReviewRecord>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        self.insert(input).await
    }

    async fn update_by_id(
        &self,
        id: i32,
        input: ReviewUpdate,
    ) -> Result<Option<ReviewRecord>, RepoError> {
        self.update(id, input).await
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, RepoError> {
        self.delete(id).await
    }
}
