use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{FieldError, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    User,
    Guide,
    LeadGuide,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guide => "guide",
            Self::LeadGuide => "lead-guide",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "guide" => Ok(Self::Guide),
            "lead-guide" => Ok(Self::LeadGuide),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Self-service profile update; privileged fields are not accepted here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMeInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

/// Admin-side update of another user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

/// Minimal structural check: one `@`, a dot in the domain, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Provide a valid email"));
    }
}

pub fn validate_password_pair(
    password: &str,
    confirm: &str,
    errors: &mut Vec<FieldError>,
) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    if password != confirm {
        errors.push(FieldError::new(
            "confirmPassword",
            "Password and confirm password are not matching",
        ));
    }
}

impl Validate for SignupInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "A user must have a name"));
        }
        validate_email(&self.email, &mut errors);
        validate_password_pair(&self.password, &self.confirm_password, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for UpdateMeInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.push(FieldError::new("name", "A user must have a name"));
        }
        if let Some(email) = &self.email {
            validate_email(email, &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.push(FieldError::new("name", "A user must have a name"));
        }
        if let Some(email) = &self.email {
            validate_email(email, &mut errors);
        }
        if let Some(role) = &self.role
            && let Err(message) = Role::from_str(role)
        {
            errors.push(FieldError::new("role", message));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupInput {
        SignupInput {
            name: "Jonas".to_string(),
            email: "jonas@example.com".to_string(),
            password: "pass1234".to_string(),
            confirm_password: "pass1234".to_string(),
        }
    }

    #[test]
    fn valid_signup_passes() {
        assert!(signup().validate().is_ok());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut input = signup();
        input.confirm_password = "pass12345".to_string();
        let errors = input.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "confirmPassword"));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut input = signup();
        input.password = "short".to_string();
        input.confirm_password = "short".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn email_format_is_checked() {
        for bad in ["plainaddress", "missing@tld", "two@@example.com", "a b@example.com"] {
            assert!(!is_valid_email(bad), "{bad} should be invalid");
        }
        assert!(is_valid_email("guide@trailhead.dev"));
    }

    #[test]
    fn roles_round_trip() {
        for role in [Role::Admin, Role::User, Role::Guide, Role::LeadGuide] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("superuser").is_err());
    }
}
