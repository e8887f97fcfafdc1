use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{FieldError, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!(
                "Difficulty must be either easy, medium or hard (got '{other}')"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A tour waypoint with its day offset into the itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourInput {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: String,
    #[serde(default)]
    pub secret_tour: bool,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<String>,
    #[serde(default)]
    pub start_location: Option<GeoPoint>,
    #[serde(default)]
    pub locations: Vec<Waypoint>,
    #[serde(default)]
    pub guides: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    /// `Some(None)` clears the discount
    #[serde(default, with = "double_option")]
    pub price_discount: Option<Option<f64>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<String>,
    pub secret_tour: Option<bool>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<String>>,
    pub start_location: Option<GeoPoint>,
    pub locations: Option<Vec<Waypoint>>,
    pub guides: Option<Vec<i32>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(de).map(Some)
    }
}

fn validate_name(name: &str, errors: &mut Vec<FieldError>) {
    let len = name.trim().chars().count();
    if len < 10 {
        errors.push(FieldError::new(
            "name",
            "A tour name must have more or equal than 10 characters",
        ));
    } else if len > 40 {
        errors.push(FieldError::new(
            "name",
            "A tour name must have less or equal than 40 characters",
        ));
    }
}

fn validate_discount(price: f64, discount: Option<f64>, errors: &mut Vec<FieldError>) {
    if let Some(discount) = discount
        && discount >= price
    {
        errors.push(FieldError::new(
            "priceDiscount",
            format!("Discount price ({discount}) should be lesser than regular price"),
        ));
    }
}

impl Validate for TourInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        validate_name(&self.name, &mut errors);
        if self.price <= 0.0 {
            errors.push(FieldError::new("price", "A tour must have a price"));
        }
        validate_discount(self.price, self.price_discount, &mut errors);
        if self.summary.trim().is_empty() {
            errors.push(FieldError::new("summary", "A tour must have a summary"));
        }
        if self.duration <= 0 {
            errors.push(FieldError::new("duration", "A tour must have a duration"));
        }
        if self.max_group_size <= 0 {
            errors.push(FieldError::new(
                "maxGroupSize",
                "A tour must have a group size",
            ));
        }
        if let Err(message) = Difficulty::from_str(&self.difficulty) {
            errors.push(FieldError::new("difficulty", message));
        }
        if self.image_cover.trim().is_empty() {
            errors.push(FieldError::new(
                "imageCover",
                "A tour must have a cover image",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for TourUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name {
            validate_name(name, &mut errors);
        }
        if let Some(price) = self.price
            && price <= 0.0
        {
            errors.push(FieldError::new("price", "A tour must have a price"));
        }
        if let Some(duration) = self.duration
            && duration <= 0
        {
            errors.push(FieldError::new("duration", "A tour must have a duration"));
        }
        if let Some(size) = self.max_group_size
            && size <= 0
        {
            errors.push(FieldError::new(
                "maxGroupSize",
                "A tour must have a group size",
            ));
        }
        if let Some(difficulty) = &self.difficulty
            && let Err(message) = Difficulty::from_str(difficulty)
        {
            errors.push(FieldError::new("difficulty", message));
        }
        // Discount against the merged price is re-checked by the repository,
        // which knows the stored price.
        if let (Some(price), Some(Some(discount))) = (self.price, self.price_discount) {
            validate_discount(price, Some(discount), &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// URL slug derived from the tour name on every save.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Derived field, never persisted.
#[must_use]
pub fn duration_weeks(duration_days: i32) -> f64 {
    f64::from(duration_days) / 7.0
}
