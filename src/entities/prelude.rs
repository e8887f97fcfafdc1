pub use super::reviews::Entity as Reviews;
pub use super::tours::Entity as Tours;
pub use super::users::Entity as Users;
