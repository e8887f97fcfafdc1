use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use serde::Serialize;

use super::user::PublicUser;
use super::{CrudRepository, RepoError, decode_list, encode_list};
use crate::entities::{tours, users};
use crate::models::tour::{GeoPoint, TourInput, TourUpdate, Waypoint, duration_weeks, slugify};
use crate::query::{Filter, FilterOp, ListQuery};
use crate::services::reports::{PlanRow, TourStatRow};

/// Tour as exposed by the API: JSON columns decoded, derived fields added.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourRecord {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub duration: i32,
    /// Derived from duration, never persisted
    pub duration_weeks: f64,
    pub max_group_size: i32,
    pub difficulty: String,
    pub secret_tour: bool,
    pub image_cover: String,
    pub images: Vec<String>,
    pub created_at: String,
    pub start_dates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<GeoPoint>,
    pub locations: Vec<Waypoint>,
    pub guides: Vec<i32>,
}

impl From<tours::Model> for TourRecord {
    fn from(model: tours::Model) -> Self {
        let start_location = match (model.start_lat, model.start_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint {
                lat,
                lng,
                address: model.start_address.clone(),
                description: model.start_description.clone(),
            }),
            _ => None,
        };

        Self {
            id: model.id,
            duration_weeks: duration_weeks(model.duration),
            images: decode_list(model.images.as_ref()),
            start_dates: decode_list(model.start_dates.as_ref()),
            locations: decode_list(model.locations.as_ref()),
            guides: decode_list(model.guides.as_ref()),
            start_location,
            name: model.name,
            slug: model.slug,
            price: model.price,
            price_discount: model.price_discount,
            summary: model.summary,
            description: model.description,
            ratings_average: model.ratings_average,
            ratings_quantity: model.ratings_quantity,
            duration: model.duration,
            max_group_size: model.max_group_size,
            difficulty: model.difficulty,
            secret_tour: model.secret_tour,
            image_cover: model.image_cover,
            created_at: model.created_at,
        }
    }
}

fn column_for(field: &str) -> Option<tours::Column> {
    match field {
        "name" => Some(tours::Column::Name),
        "slug" => Some(tours::Column::Slug),
        "price" => Some(tours::Column::Price),
        "priceDiscount" => Some(tours::Column::PriceDiscount),
        "duration" => Some(tours::Column::Duration),
        "maxGroupSize" => Some(tours::Column::MaxGroupSize),
        "difficulty" => Some(tours::Column::Difficulty),
        "ratingsAverage" => Some(tours::Column::RatingsAverage),
        "ratingsQuantity" => Some(tours::Column::RatingsQuantity),
        "createdAt" => Some(tours::Column::CreatedAt),
        _ => None,
    }
}

/// Numeric values compare numerically, everything else as text.
pub(crate) fn comparison<C: ColumnTrait>(col: C, filter: &Filter) -> SimpleExpr {
    if let Ok(number) = filter.value.parse::<f64>() {
        match filter.op {
            FilterOp::Eq => col.eq(number),
            FilterOp::Gt => col.gt(number),
            FilterOp::Gte => col.gte(number),
            FilterOp::Lt => col.lt(number),
            FilterOp::Lte => col.lte(number),
        }
    } else {
        let value = filter.value.as_str();
        match filter.op {
            FilterOp::Eq => col.eq(value),
            FilterOp::Gt => col.gt(value),
            FilterOp::Gte => col.gte(value),
            FilterOp::Lt => col.lt(value),
            FilterOp::Lte => col.lte(value),
        }
    }
}

fn apply_list_query(mut select: Select<tours::Entity>, query: &ListQuery) -> Select<tours::Entity> {
    for filter in &query.filters {
        // Filters on unknown fields are dropped rather than rejected.
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
    select.offset(query.offset()).limit(query.limit)
}

pub struct TourRepository {
    conn: DatabaseConnection,
}

impl TourRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn visible() -> Select<tours::Entity> {
        // Secret tours only surface through direct-by-id access.
        tours::Entity::find().filter(tours::Column::SecretTour.eq(false))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<TourRecord>, RepoError> {
        let models = apply_list_query(Self::visible(), query)
            .all(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(models.into_iter().map(TourRecord::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<TourRecord>, RepoError> {
        let model = tours::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(model.map(TourRecord::from))
    }

    /// Direct lookup with the guide users eager-loaded.
    pub async fn get_populated(
        &self,
        id: i32,
    ) -> Result<Option<(TourRecord, Vec<PublicUser>)>, RepoError> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };

        let guides = if record.guides.is_empty() {
            Vec::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(record.guides.clone()))
                .all(&self.conn)
                .await
                .map_err(RepoError::from)?
                .into_iter()
                .map(PublicUser::from)
                .collect()
        };

        Ok(Some((record, guides)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<TourRecord>, RepoError> {
        let model = Self::visible()
            .filter(tours::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(model.map(TourRecord::from))
    }

    pub async fn insert(&self, input: TourInput) -> Result<TourRecord, RepoError> {
        let start = input.start_location.as_ref();
        let model = tours::ActiveModel {
            slug: Set(slugify(&input.name)),
            name: Set(input.name),
            price: Set(input.price),
            price_discount: Set(input.price_discount),
            summary: Set(input.summary),
            description: Set(input.description),
            ratings_average: Set(4.5),
            ratings_quantity: Set(0),
            duration: Set(input.duration),
            max_group_size: Set(input.max_group_size),
            difficulty: Set(input.difficulty),
            secret_tour: Set(input.secret_tour),
            image_cover: Set(input.image_cover),
            images: Set(encode_list(&input.images)),
            created_at: Set(Utc::now().to_rfc3339()),
            start_dates: Set(encode_list(&input.start_dates)),
            start_lat: Set(start.map(|p| p.lat)),
            start_lng: Set(start.map(|p| p.lng)),
            start_address: Set(start.and_then(|p| p.address.clone())),
            start_description: Set(start.and_then(|p| p.description.clone())),
            locations: Set(encode_list(&input.locations)),
            guides: Set(encode_list(&input.guides)),
            ..Default::default()
        };

        let model = model.insert(&self.conn).await.map_err(RepoError::from)?;
        Ok(TourRecord::from(model))
    }

    pub async fn update(
        &self,
        id: i32,
        input: TourUpdate,
    ) -> Result<Option<TourRecord>, RepoError> {
        let Some(existing) = tours::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(RepoError::from)?
        else {
            return Ok(None);
        };

        // The discount invariant is checked against the merged state; the
        // input validator alone cannot see the stored price.
        let merged_price = input.price.unwrap_or(existing.price);
        let merged_discount = match input.price_discount {
            Some(discount) => discount,
            None => existing.price_discount,
        };
        if let Some(discount) = merged_discount
            && discount >= merged_price
        {
            return Err(RepoError::Validation(format!(
                "Discount price ({discount}) should be lesser than regular price"
            )));
        }

        let mut active: tours::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.slug = Set(slugify(&name));
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(discount) = input.price_discount {
            active.price_discount = Set(discount);
        }
        if let Some(summary) = input.summary {
            active.summary = Set(summary);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(duration) = input.duration {
            active.duration = Set(duration);
        }
        if let Some(size) = input.max_group_size {
            active.max_group_size = Set(size);
        }
        if let Some(difficulty) = input.difficulty {
            active.difficulty = Set(difficulty);
        }
        if let Some(secret) = input.secret_tour {
            active.secret_tour = Set(secret);
        }
        if let Some(cover) = input.image_cover {
            active.image_cover = Set(cover);
        }
        if let Some(images) = input.images {
            active.images = Set(encode_list(&images));
        }
        if let Some(dates) = input.start_dates {
            active.start_dates = Set(encode_list(&dates));
        }
        if let Some(point) = input.start_location {
            active.start_lat = Set(Some(point.lat));
            active.start_lng = Set(Some(point.lng));
            active.start_address = Set(point.address);
            active.start_description = Set(point.description);
        }
        if let Some(locations) = input.locations {
            active.locations = Set(encode_list(&locations));
        }
        if let Some(guides) = input.guides {
            active.guides = Set(encode_list(&guides));
        }

        let model = active.update(&self.conn).await.map_err(RepoError::from)?;
        Ok(Some(TourRecord::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool, RepoError> {
        let result = tours::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(result.rows_affected > 0)
    }

    /// Rows for the stats report; the builder applies the rating cutoff.
    pub async fn stat_rows(&self) -> Result<Vec<TourStatRow>, RepoError> {
        let models = Self::visible().all(&self.conn).await.map_err(RepoError::from)?;
        Ok(models
            .into_iter()
            .map(|m| TourStatRow {
                difficulty: m.difficulty,
                ratings_average: m.ratings_average,
                ratings_quantity: i64::from(m.ratings_quantity),
                price: m.price,
            })
            .collect())
    }

    /// Rows for the monthly plan; unparsable start dates are skipped.
    pub async fn plan_rows(&self) -> Result<Vec<PlanRow>, RepoError> {
        let models = Self::visible().all(&self.conn).await.map_err(RepoError::from)?;
        Ok(models
            .into_iter()
            .map(|m| {
                let raw: Vec<String> = decode_list(m.start_dates.as_ref());
                PlanRow {
                    name: m.name,
                    start_dates: raw
                        .iter()
                        .filter_map(|s| {
                            DateTime::parse_from_rfc3339(s)
                                .ok()
                                .map(|d| d.with_timezone(&Utc))
                        })
                        .collect(),
                }
            })
            .collect())
    }

    /// Non-secret tours that carry a start location.
    pub async fn geo_candidates(&self) -> Result<Vec<TourRecord>, RepoError> {
        let models = Self::visible()
            .filter(tours::Column::StartLat.is_not_null())
            .filter(tours::Column::StartLng.is_not_null())
            .all(&self.conn)
            .await
            .map_err(RepoError::from)?;
        Ok(models.into_iter().map(TourRecord::from).collect())
    }
}

#[async_trait]
impl CrudRepository for TourRepository {
    type Output = TourRecord;
    type Create = TourInput;
    type Update = TourUpdate;

    async fn find_all(&self, query: &ListQuery) -> Result<Vec<TourRecord>, RepoError> {
        self.list(query).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<TourRecord>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, input: TourInput) -> Result<TourRecord, RepoError> {
        self.insert(input).await
    }

    async fn update_by_id(
        &self,
        id: i32,
        input: TourUpdate,
    ) -> Result<Option<TourRecord>, RepoError> {
        self.update(id, input).await
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, RepoError> {
        self.delete(id).await
    }
}
