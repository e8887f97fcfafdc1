//! Query-string to list-query translation.
//!
//! Turns the raw query pairs of a list request into filters, a sort order,
//! a field projection, and a pagination window. Keys of the form
//! `field[op]` with op in {gt, gte, lt, lte} become comparison filters;
//! every other non-reserved key becomes an equality filter.

use std::collections::HashMap;

use serde_json::Value;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// Keys that drive the query shape instead of filtering.
const RESERVED: [&str; 4] = ["page", "sort", "limit", "fields"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    /// Projection applied at serialization time; `None` keeps all fields.
    pub fields: Option<Vec<String>>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            fields: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    /// Builds a query from raw query-string pairs.
    ///
    /// Malformed numeric `page`/`limit` values silently fall back to their
    /// defaults; the translator is deliberately permissive.
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut query = Self::default();

        for (key, value) in params {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            query.filters.push(parse_filter(key, value));
        }
        // HashMap iteration order is arbitrary; keep filters stable for
        // callers and tests.
        query.filters.sort_by(|a, b| a.field.cmp(&b.field));

        if let Some(sort) = params.get("sort") {
            query.sort = parse_sort(sort);
        }
        if let Some(fields) = params.get("fields") {
            let fields: Vec<String> = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(ToString::to_string)
                .collect();
            if !fields.is_empty() {
                query.fields = Some(fields);
            }
        }

        query.page = parse_or(params.get("page"), DEFAULT_PAGE).max(1);
        query.limit = parse_or(params.get("limit"), DEFAULT_LIMIT).max(1);

        query
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

fn parse_or(value: Option<&String>, default: u64) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_filter(key: &str, value: &str) -> Filter {
    // `price[gte]` style comparison keys; an unrecognized operator token
    // degrades to an equality filter on the base field.
    if let Some((field, rest)) = key.split_once('[')
        && let Some(token) = rest.strip_suffix(']')
    {
        let op = FilterOp::from_token(token).unwrap_or(FilterOp::Eq);
        return Filter {
            field: field.to_string(),
            op,
            value: value.to_string(),
        };
    }
    Filter::eq(key, value)
}

fn parse_sort(spec: &str) -> Vec<SortKey> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "-")
        .map(|s| {
            s.strip_prefix('-').map_or_else(
                || SortKey {
                    field: s.to_string(),
                    descending: false,
                },
                |field| SortKey {
                    field: field.to_string(),
                    descending: true,
                },
            )
        })
        .collect()
}

/// Strips every object in `value` down to the projected fields.
///
/// `id` is always retained, mirroring the identifier-by-default behavior of
/// the document store this API grew out of.
pub fn project_fields(value: &mut Value, fields: &[String]) {
    match value {
        Value::Array(items) => {
            for item in items {
                project_fields(item, fields);
            }
        }
        Value::Object(map) => {
            map.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_first_page_of_one_hundred() {
        let q = ListQuery::from_params(&params(&[]));
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 100);
        assert_eq!(q.offset(), 0);
        assert!(q.filters.is_empty());
        assert!(q.sort.is_empty());
        assert!(q.fields.is_none());
    }

    #[test]
    fn malformed_pagination_falls_back_to_defaults() {
        let q = ListQuery::from_params(&params(&[("page", "abc"), ("limit", "-3")]));
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 100);

        let q = ListQuery::from_params(&params(&[("page", "3"), ("limit", "20")]));
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn comparison_tokens_are_rewritten() {
        let q = ListQuery::from_params(&params(&[
            ("price[gte]", "500"),
            ("duration[lt]", "10"),
            ("ratingsAverage[gt]", "4.5"),
            ("maxGroupSize[lte]", "25"),
        ]));
        let ops: HashMap<_, _> = q
            .filters
            .iter()
            .map(|f| (f.field.as_str(), f.op))
            .collect();
        assert_eq!(ops["price"], FilterOp::Gte);
        assert_eq!(ops["duration"], FilterOp::Lt);
        assert_eq!(ops["ratingsAverage"], FilterOp::Gt);
        assert_eq!(ops["maxGroupSize"], FilterOp::Lte);
    }

    #[test]
    fn bare_keys_become_equality_filters() {
        let q = ListQuery::from_params(&params(&[("difficulty", "easy"), ("page", "2")]));
        assert_eq!(q.filters, vec![Filter::eq("difficulty", "easy")]);
        assert_eq!(q.page, 2);
    }

    #[test]
    fn unknown_operator_degrades_to_equality() {
        let q = ListQuery::from_params(&params(&[("price[near]", "500")]));
        assert_eq!(q.filters[0].op, FilterOp::Eq);
        assert_eq!(q.filters[0].field, "price");
    }

    #[test]
    fn sort_spec_parses_signs() {
        let q = ListQuery::from_params(&params(&[("sort", "-price,ratingsAverage")]));
        assert_eq!(
            q.sort,
            vec![
                SortKey {
                    field: "price".to_string(),
                    descending: true
                },
                SortKey {
                    field: "ratingsAverage".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn projection_keeps_id_and_listed_fields() {
        let mut value = serde_json::json!([
            {"id": 1, "name": "Forest Hiker", "price": 497.0, "summary": "hike"},
            {"id": 2, "name": "Sea Explorer", "price": 897.0, "summary": "sail"}
        ]);
        project_fields(&mut value, &["name".to_string()]);
        assert_eq!(
            value,
            serde_json::json!([
                {"id": 1, "name": "Forest Hiker"},
                {"id": 2, "name": "Sea Explorer"}
            ])
        );
    }
}
