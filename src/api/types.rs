use serde::Serialize;

/// Response envelope shared by every JSON endpoint.
///
/// Successful responses carry `status: "success"` plus the payload under
/// `data`; list responses add a `results` count and the auth endpoints a
/// `token`. Failures go through [`super::ApiError`] instead.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            token: None,
            data: Some(data),
        }
    }

    pub const fn success_with_results(results: usize, data: T) -> Self {
        Self {
            status: "success",
            results: Some(results),
            token: None,
            data: Some(data),
        }
    }

    pub const fn success_with_token(token: String, data: T) -> Self {
        Self {
            status: "success",
            results: None,
            token: Some(token),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Bodyless success, used where only the token matters.
    pub const fn token_only(token: String) -> Self {
        Self {
            status: "success",
            results: None,
            token: Some(token),
            data: None,
        }
    }
}
