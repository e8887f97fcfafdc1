use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tours")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    /// Derived from the name on every save, lowercase
    #[sea_orm(indexed)]
    pub slug: String,

    pub price: f64,

    pub price_discount: Option<f64>,

    pub summary: String,

    pub description: Option<String>,

    pub ratings_average: f64,

    pub ratings_quantity: i32,

    /// Tour length in days
    pub duration: i32,

    pub max_group_size: i32,

    /// easy | medium | hard
    pub difficulty: String,

    /// Hidden from listings, reports, and geo queries
    pub secret_tour: bool,

    pub image_cover: String,

    /// JSON array stored as string
    pub images: Option<String>,

    pub created_at: String,

    /// JSON array of RFC 3339 timestamps stored as string
    pub start_dates: Option<String>,

    pub start_lat: Option<f64>,

    pub start_lng: Option<f64>,

    pub start_address: Option<String>,

    pub start_description: Option<String>,

    /// JSON array of waypoints (lat, lng, address, description, day)
    pub locations: Option<String>,

    /// JSON array of guide user ids
    pub guides: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
