//! Minimal server-rendered pages on top of the same repositories.

use axum::{
    extract::{Path, State},
    response::Html,
};
use std::sync::Arc;

use super::ApiError;
use crate::query::{Filter, ListQuery};
use crate::state::AppState;

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>{} | Trailhead</title></head><body>{body}</body></html>",
        esc(title)
    ))
}

/// GET /
pub async fn overview(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let tours = state.store().tours().list(&ListQuery::default()).await?;

    let mut body = String::from("<h1>All Tours</h1><ul>");
    for tour in &tours {
        body.push_str(&format!(
            "<li><a href=\"/tour/{}\">{}</a> &mdash; {} &mdash; ${:.2} \
             ({:.1} / {} ratings)</li>",
            esc(&tour.slug),
            esc(&tour.name),
            esc(&tour.summary),
            tour.price,
            tour.ratings_average,
            tour.ratings_quantity,
        ));
    }
    body.push_str("</ul>");

    Ok(page("Exciting tours for adventurous people", &body))
}

/// GET /tour/{slug}
pub async fn tour_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, ApiError> {
    let Some(tour) = state.store().tours().get_by_slug(&slug).await? else {
        return Err(ApiError::NotFound(
            "There is no tour with that name".to_string(),
        ));
    };

    let reviews = state
        .store()
        .reviews()
        .list(&ListQuery {
            filters: vec![Filter::eq("tour", tour.id.to_string())],
            ..ListQuery::default()
        })
        .await?;

    let mut body = format!(
        "<h1>{}</h1><p>{}</p><p>{} days &middot; {} difficulty &middot; ${:.2}</p>",
        esc(&tour.name),
        esc(&tour.summary),
        tour.duration,
        esc(&tour.difficulty),
        tour.price,
    );
    if let Some(description) = &tour.description {
        body.push_str(&format!("<p>{}</p>", esc(description)));
    }

    body.push_str("<h2>Reviews</h2><ul>");
    for review in &reviews {
        let author = review
            .user
            .as_ref()
            .map_or_else(|| "Anonymous".to_string(), |u| esc(&u.name));
        body.push_str(&format!(
            "<li><strong>{author}</strong> ({:.1}/5): {}</li>",
            review.rating,
            esc(&review.review),
        ));
    }
    body.push_str("</ul>");

    Ok(page(&tour.name, &body))
}
