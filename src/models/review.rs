use serde::Deserialize;

use super::{FieldError, Validate};

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub review: String,
    pub rating: f64,
    /// Defaulted from the nested route when absent
    #[serde(default)]
    pub tour: Option<i32>,
    /// Defaulted from the authenticated user when absent
    #[serde(default)]
    pub user: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub review: Option<String>,
    pub rating: Option<f64>,
}

fn validate_rating(rating: f64, errors: &mut Vec<FieldError>) {
    if !(1.0..=5.0).contains(&rating) {
        errors.push(FieldError::new("rating", "Rating must be between 1 and 5"));
    }
}

impl Validate for ReviewInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.review.trim().is_empty() {
            errors.push(FieldError::new("review", "Must contain review"));
        }
        validate_rating(self.rating, &mut errors);
        if self.tour.is_none() {
            errors.push(FieldError::new("tour", "A review must have a tour associated"));
        }
        if self.user.is_none() {
            errors.push(FieldError::new("user", "A review must have a user associated"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for ReviewUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Some(review) = &self.review
            && review.trim().is_empty()
        {
            errors.push(FieldError::new("review", "Must contain review"));
        }
        if let Some(rating) = self.rating {
            validate_rating(rating, &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_enforced() {
        let review = ReviewInput {
            review: "Great tour".to_string(),
            rating: 5.5,
            tour: Some(1),
            user: Some(1),
        };
        let errors = review.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "rating"));
    }

    #[test]
    fn tour_and_user_are_required() {
        let review = ReviewInput {
            review: "Great tour".to_string(),
            rating: 4.0,
            tour: None,
            user: None,
        };
        let errors = review.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
