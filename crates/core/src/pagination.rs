//! Paginated list envelope and the last-id cursor convention
//!
//! Every list endpoint returns a page of records ordered by descending
//! recency. The `_id` of the last record on a page is the cursor for the
//! next one; an empty page is the only end-of-list signal. Endpoints that
//! key their records under an entity-specific field are normalized into
//! [`Page`] by a [`ListKey`] at the boundary.

use crate::error::{CoreError, CoreResult};
use crate::locale::Locale;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Default page size used by list screens
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Anything addressable by the backend's `_id`
pub trait Identified {
    fn id(&self) -> &str;
}

/// Untyped backend record: its `_id` plus whatever else the endpoint returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// Decode this record into a typed entity
    pub fn decode<T: DeserializeOwned>(&self) -> CoreResult<T> {
        Ok(serde_json::to_value(self).and_then(serde_json::from_value)?)
    }
}

impl Identified for Record {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub is_success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Vec<T>,
    #[serde(default)]
    pub data_count: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            is_success: true,
            message: String::new(),
            data: Vec::new(),
            data_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            is_success: self.is_success,
            message: self.message,
            data: self.data.into_iter().map(f).collect(),
            data_count: self.data_count,
        }
    }
}

impl<T: Identified> Page<T> {
    /// Cursor for the page after this one, `None` once the list is exhausted
    pub fn next_cursor(&self) -> Option<&str> {
        next_cursor(&self.data)
    }
}

/// `_id` of the last item, or `None` for an empty slice.
///
/// A short page still yields a cursor; only an empty page ends the list.
pub fn next_cursor<T: Identified>(items: &[T]) -> Option<&str> {
    items.last().map(Identified::id)
}

/// Field under which an endpoint returns its records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ListKey {
    #[default]
    Data,
    Users,
    Locations,
}

impl ListKey {
    pub const fn field(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Users => "users",
            Self::Locations => "locations",
        }
    }

    /// Normalize a raw list response body into the generic page shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Shape`] when the body is not an object or the
    /// record field is not an array, and [`CoreError::Serialization`] when
    /// records do not decode as `T`.
    pub fn normalize<T: DeserializeOwned>(self, body: JsonValue) -> CoreResult<Page<T>> {
        let JsonValue::Object(mut body) = body else {
            return Err(CoreError::shape_error("list response is not a JSON object"));
        };

        let items = match body.remove(self.field()) {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items,
            Some(_) => {
                return Err(CoreError::shape_error(format!(
                    "field `{}` is not an array",
                    self.field()
                )));
            }
        };

        let data = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;

        let data_count = body
            .get("dataCount")
            .or_else(|| body.get("count"))
            .and_then(JsonValue::as_u64)
            .unwrap_or(data.len() as u64);

        Ok(Page {
            is_success: body
                .get("isSuccess")
                .and_then(JsonValue::as_bool)
                .unwrap_or(true),
            message: body
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
            data,
            data_count,
        })
    }
}

/// Inclusive price bounds from the storefront price slider
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Inclusive date bounds from the dashboard date pickers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Entity-specific filters shaped into query-string parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub price: PriceRange,
    pub dates: DateRange,
    pub status: Option<String>,
    pub category: Option<String>,
    /// Additional endpoint-specific parameters passed through as-is
    pub extra: Vec<(String, String)>,
}

/// Parameters of one list request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub locale: Locale,
    pub limit: u32,
    pub last_id: Option<String>,
    pub search: Option<String>,
    pub filters: Filters,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            limit: DEFAULT_PAGE_LIMIT,
            last_id: None,
            search: None,
            filters: Filters::default(),
        }
    }
}

impl ListQuery {
    pub fn new(locale: Locale, limit: u32) -> Self {
        Self {
            locale,
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    #[must_use]
    pub fn price_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.filters.price = PriceRange { min, max };
        self
    }

    #[must_use]
    pub fn dated_between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.filters.dates = DateRange { start, end };
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.filters.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.filters.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.extra.push((key.into(), value.into()));
        self
    }

    /// Same query continued after `cursor`
    #[must_use]
    pub fn after(&self, cursor: Option<&str>) -> Self {
        Self {
            last_id: cursor.map(str::to_string),
            ..self.clone()
        }
    }

    /// Reject filter combinations that can never match.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuery`] for a zero limit, a negative
    /// price, or an inverted price or date range.
    pub fn validate(&self) -> CoreResult<()> {
        if self.limit == 0 {
            return Err(CoreError::invalid_query("limit must be at least 1"));
        }
        let PriceRange { min, max } = self.filters.price;
        if min.is_some_and(|m| m < 0.0) || max.is_some_and(|m| m < 0.0) {
            return Err(CoreError::invalid_query("price bounds must not be negative"));
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(CoreError::invalid_query(format!(
                    "minimum price {min} exceeds maximum price {max}"
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.filters.dates.start, self.filters.dates.end) {
            if start > end {
                return Err(CoreError::invalid_query(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        Ok(())
    }

    /// Query-string pairs for this request, validated first.
    ///
    /// # Errors
    ///
    /// Propagates [`ListQuery::validate`] failures.
    pub fn to_query_pairs(&self) -> CoreResult<Vec<(String, String)>> {
        self.validate()?;

        let mut pairs = vec![
            ("lang".to_string(), self.locale.as_str().to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(last_id) = &self.last_id {
            pairs.push(("lastId".to_string(), last_id.clone()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }

        let filters = &self.filters;
        if let Some(min) = filters.price.min {
            pairs.push(("minPrice".to_string(), min.to_string()));
        }
        if let Some(max) = filters.price.max {
            pairs.push(("maxPrice".to_string(), max.to_string()));
        }
        if let Some(start) = filters.dates.start {
            pairs.push(("startDate".to_string(), start.to_string()));
        }
        if let Some(end) = filters.dates.end {
            pairs.push(("endDate".to_string(), end.to_string()));
        }
        if let Some(status) = &filters.status {
            pairs.push(("status".to_string(), status.clone()));
        }
        if let Some(category) = &filters.category {
            pairs.push(("category".to_string(), category.clone()));
        }
        pairs.extend(filters.extra.iter().cloned());

        Ok(pairs)
    }
}
