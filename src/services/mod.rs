pub mod geo;
pub mod mailer;
pub mod password;
pub mod reports;
pub mod token;

pub use mailer::{LogMailer, Mail, MailError, Mailer};
pub use token::{Claims, TokenError, TokenService};
