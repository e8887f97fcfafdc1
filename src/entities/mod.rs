pub mod prelude;

pub mod reviews;
pub mod tours;
pub mod users;
