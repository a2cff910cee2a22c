//! Query-string driven listing features for tours.
//!
//! [`ApiFeatures`] turns raw request parameters into a typed [`TourQuery`]
//! through four chainable steps (filter, sort, field projection, pagination).
//! Every field name and comparison operator is checked against an allow-list;
//! nothing from the query string reaches the SQL text except through bind
//! parameters or the fixed column names below.

use serde_json::{Map, Value};
use sqlx::{Postgres, QueryBuilder};

use crate::{
    config::ApiConfig,
    error::{AppError, AppResult},
    models::{Difficulty, Tour},
};

/// Parameter names that never act as filters
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Tour attributes addressable from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourField {
    Id,
    Name,
    Duration,
    MaxGroupSize,
    Difficulty,
    RatingsAverage,
    RatingsQuantity,
    Price,
    Summary,
    Description,
    StartDates,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Integer,
    Number,
    Difficulty,
    Other,
}

impl TourField {
    const ALL: [TourField; 12] = [
        TourField::Id,
        TourField::Name,
        TourField::Duration,
        TourField::MaxGroupSize,
        TourField::Difficulty,
        TourField::RatingsAverage,
        TourField::RatingsQuantity,
        TourField::Price,
        TourField::Summary,
        TourField::Description,
        TourField::StartDates,
        TourField::CreatedAt,
    ];

    /// Look up a field by its JSON name
    pub fn from_param(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.param() == name)
    }

    /// JSON (and query-string) name
    pub fn param(self) -> &'static str {
        match self {
            TourField::Id => "id",
            TourField::Name => "name",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "maxGroupSize",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratingsAverage",
            TourField::RatingsQuantity => "ratingsQuantity",
            TourField::Price => "price",
            TourField::Summary => "summary",
            TourField::Description => "description",
            TourField::StartDates => "startDates",
            TourField::CreatedAt => "createdAt",
        }
    }

    /// Column in the `tours` table
    pub fn column(self) -> &'static str {
        match self {
            TourField::Id => "id",
            TourField::Name => "name",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "max_group_size",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratings_average",
            TourField::RatingsQuantity => "ratings_quantity",
            TourField::Price => "price",
            TourField::Summary => "summary",
            TourField::Description => "description",
            TourField::StartDates => "start_dates",
            TourField::CreatedAt => "created_at",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            TourField::Name | TourField::Summary => FieldKind::Text,
            TourField::Duration | TourField::MaxGroupSize | TourField::RatingsQuantity => {
                FieldKind::Integer
            }
            TourField::RatingsAverage | TourField::Price => FieldKind::Number,
            TourField::Difficulty => FieldKind::Difficulty,
            TourField::Id
            | TourField::Description
            | TourField::StartDates
            | TourField::CreatedAt => FieldKind::Other,
        }
    }

    pub fn is_filterable(self) -> bool {
        self.kind() != FieldKind::Other
    }

    pub fn is_sortable(self) -> bool {
        self.is_filterable() || self == TourField::CreatedAt
    }
}

/// Comparison operators accepted in `field[op]=value` parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn from_param(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(Comparison::Gt),
            "gte" => Some(Comparison::Gte),
            "lt" => Some(Comparison::Lt),
            "lte" => Some(Comparison::Lte),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i32),
    Number(f64),
    Difficulty(Difficulty),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: TourField,
    pub op: Comparison,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: TourField,
    pub descending: bool,
}

/// Executable description of a tours listing
#[derive(Debug, Clone, PartialEq)]
pub struct TourQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    /// `None` returns every field except `createdAt`
    pub fields: Option<Vec<TourField>>,
    pub page: i64,
    pub limit: i64,
}

impl TourQuery {
    fn with_defaults(config: &ApiConfig) -> Self {
        Self {
            filters: Vec::new(),
            sort: vec![SortKey {
                field: TourField::CreatedAt,
                descending: true,
            }],
            fields: None,
            page: 1,
            limit: config.default_page_size,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Append WHERE, ORDER BY, LIMIT and OFFSET clauses to `builder`
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, filter) in self.filters.iter().enumerate() {
            builder
                .push(if i == 0 { " WHERE " } else { " AND " })
                .push(filter.field.column())
                .push(" ")
                .push(filter.op.sql())
                .push(" ");
            match &filter.value {
                FilterValue::Text(s) => builder.push_bind(s.clone()),
                FilterValue::Integer(n) => builder.push_bind(*n),
                FilterValue::Number(n) => builder.push_bind(*n),
                FilterValue::Difficulty(d) => builder.push_bind(*d),
            };
        }

        let order: Vec<String> = self
            .sort
            .iter()
            .map(|key| {
                format!(
                    "{} {}",
                    key.field.column(),
                    if key.descending { "DESC" } else { "ASC" }
                )
            })
            // Tiebreaker so pages never overlap
            .chain(std::iter::once("id ASC".to_string()))
            .collect();
        builder.push(" ORDER BY ").push(order.join(", "));

        builder
            .push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset());
    }

    /// Reduce each tour to the requested fields
    pub fn project(&self, tours: Vec<Tour>) -> AppResult<Vec<Map<String, Value>>> {
        tours
            .into_iter()
            .map(|tour| {
                let Value::Object(mut map) =
                    serde_json::to_value(tour).map_err(|e| AppError::Internal(e.to_string()))?
                else {
                    return Err(AppError::Internal(
                        "Tour did not serialize to an object".to_string(),
                    ));
                };
                match &self.fields {
                    Some(fields) => map.retain(|key, _| {
                        key == TourField::Id.param() || fields.iter().any(|f| f.param() == key)
                    }),
                    None => {
                        map.remove(TourField::CreatedAt.param());
                    }
                }
                Ok(map)
            })
            .collect()
    }
}

/// Decode a raw query string into ordered key/value pairs
pub fn parse_query_string(raw: Option<&str>) -> AppResult<Vec<(String, String)>> {
    match raw {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_urlencoded::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("Malformed query string: {}", e))),
    }
}

/// Split `price[gte]` into `("price", Some("gte"))`
fn split_filter_key(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
        Some((name, op)) => (name, Some(op)),
        None => (key, None),
    }
}

fn parse_filter(key: &str, raw_value: &str) -> AppResult<Filter> {
    let (name, op_name) = split_filter_key(key);

    let field = TourField::from_param(name)
        .filter(|f| f.is_filterable())
        .ok_or_else(|| AppError::BadRequest(format!("Cannot filter on '{}'", name)))?;

    let op = match op_name {
        None => Comparison::Eq,
        Some(op_name) => Comparison::from_param(op_name).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported filter operator '{}'", op_name))
        })?,
    };

    let kind = field.kind();
    if op != Comparison::Eq && matches!(kind, FieldKind::Text | FieldKind::Difficulty) {
        return Err(AppError::BadRequest(format!(
            "Only equality filters are supported for '{}'",
            field.param()
        )));
    }

    let invalid = || {
        AppError::BadRequest(format!(
            "Invalid value '{}' for '{}'",
            raw_value,
            field.param()
        ))
    };

    let value = match kind {
        FieldKind::Integer => {
            FilterValue::Integer(raw_value.trim().parse().map_err(|_| invalid())?)
        }
        FieldKind::Number => {
            let n: f64 = raw_value.trim().parse().map_err(|_| invalid())?;
            if !n.is_finite() {
                return Err(invalid());
            }
            FilterValue::Number(n)
        }
        FieldKind::Difficulty => {
            FilterValue::Difficulty(raw_value.parse().map_err(|_| invalid())?)
        }
        FieldKind::Text => FilterValue::Text(raw_value.to_string()),
        FieldKind::Other => return Err(invalid()),
    };

    Ok(Filter { field, op, value })
}

fn parse_positive(name: &str, raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| AppError::BadRequest(format!("'{}' must be a positive integer", name)))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Builder applying query-string parameters to a tours listing.
///
/// ```ignore
/// let query = ApiFeatures::new(params, &config.api)
///     .filter()?
///     .sort()?
///     .limit_fields()?
///     .paginate()?
///     .into_query();
/// ```
pub struct ApiFeatures<'a> {
    params: Vec<(String, String)>,
    config: &'a ApiConfig,
    query: TourQuery,
}

impl<'a> ApiFeatures<'a> {
    pub fn new(params: Vec<(String, String)>, config: &'a ApiConfig) -> Self {
        Self {
            params,
            config,
            query: TourQuery::with_defaults(config),
        }
    }

    pub fn from_query_string(raw: Option<&str>, config: &'a ApiConfig) -> AppResult<Self> {
        Ok(Self::new(parse_query_string(raw)?, config))
    }

    /// Last non-empty value of a reserved parameter
    fn reserved(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn filter(mut self) -> AppResult<Self> {
        self.query.filters = self
            .params
            .iter()
            .filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| parse_filter(k, v))
            .collect::<AppResult<_>>()?;
        Ok(self)
    }

    pub fn sort(mut self) -> AppResult<Self> {
        if let Some(raw) = self.reserved("sort") {
            let keys = split_list(raw)
                .map(|item| {
                    let (name, descending) = match item.strip_prefix('-') {
                        Some(name) => (name, true),
                        None => (item, false),
                    };
                    TourField::from_param(name)
                        .filter(|f| f.is_sortable())
                        .map(|field| SortKey { field, descending })
                        .ok_or_else(|| AppError::BadRequest(format!("Cannot sort by '{}'", name)))
                })
                .collect::<AppResult<Vec<_>>>()?;
            if !keys.is_empty() {
                self.query.sort = keys;
            }
        }
        Ok(self)
    }

    pub fn limit_fields(mut self) -> AppResult<Self> {
        if let Some(raw) = self.reserved("fields") {
            let fields = split_list(raw)
                .map(|name| {
                    TourField::from_param(name)
                        .ok_or_else(|| AppError::BadRequest(format!("Unknown field '{}'", name)))
                })
                .collect::<AppResult<Vec<_>>>()?;
            if !fields.is_empty() {
                self.query.fields = Some(fields);
            }
        }
        Ok(self)
    }

    pub fn paginate(mut self) -> AppResult<Self> {
        let page = match self.reserved("page") {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };
        let limit = match self.reserved("limit") {
            Some(raw) => parse_positive("limit", raw)?,
            None => self.config.default_page_size,
        }
        .min(self.config.max_page_size);

        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::BadRequest("'page' is out of range".to_string()));
        }

        self.query.page = page;
        self.query.limit = limit;
        Ok(self)
    }

    pub fn into_query(self) -> TourQuery {
        self.query
    }
}
