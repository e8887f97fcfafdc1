use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    pub photo: Option<String>,

    /// admin | user | guide | lead-guide
    pub role: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub password_changed_at: Option<String>,

    /// SHA-256 hex of the plaintext reset token
    pub password_reset_token: Option<String>,

    pub password_reset_expires: Option<String>,

    /// Soft-delete marker; inactive users are excluded from default queries
    pub active: bool,

    pub created_at: String,

    pub updated_at: String,
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
