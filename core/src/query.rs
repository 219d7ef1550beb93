//! Query specifications and semantic equivalence.
//!
//! # Design
//! The API fills in defaults on the queries it stores and echoes back: an
//! explicit `limit` of 1000, a `time_range` of 7200, `granularity` 0, a
//! `COUNT` calculation when none was given, and it drops
//! `filter_combination` when it is AND. [`QuerySpec::equivalent_to`] compares
//! two specs modulo those substitutions, so a caller can tell a real change
//! from a server-side rewrite of the same query.
//!
//! Filter values are a tagged union rather than free-form JSON. The
//! constructor on [`FilterSpec`] enforces which operators take which value
//! shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_LIMIT: u32 = 1000;
pub const DEFAULT_TIME_RANGE: u32 = 7200;
pub const DEFAULT_GRANULARITY: u32 = 0;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationOp {
    Count,
    Concurrency,
    Sum,
    Avg,
    CountDistinct,
    Heatmap,
    Max,
    Min,
    P001,
    P01,
    P05,
    P10,
    P20,
    P25,
    P50,
    P75,
    P80,
    P90,
    P95,
    P99,
    P999,
    RateAvg,
    RateSum,
    RateMax,
}

impl CalculationOp {
    /// Whether the op is applied to a column. Only `COUNT` and
    /// `CONCURRENCY` stand alone.
    pub fn requires_column(&self) -> bool {
        !matches!(self, CalculationOp::Count | CalculationOp::Concurrency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    DoesNotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "starts-with")]
    StartsWith,
    #[serde(rename = "does-not-start-with")]
    DoesNotStartWith,
    #[serde(rename = "ends-with")]
    EndsWith,
    #[serde(rename = "does-not-end-with")]
    DoesNotEndWith,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "does-not-exist")]
    DoesNotExist,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does-not-contain")]
    DoesNotContain,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
}

impl FilterOp {
    /// Operators that take no value.
    pub fn is_unary(&self) -> bool {
        matches!(self, FilterOp::Exists | FilterOp::DoesNotExist)
    }

    /// Operators that take a list of values.
    pub fn is_set(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::NotIn)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterCombination {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HavingOp {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    DoesNotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
}

// ---------------------------------------------------------------------------
// Query parts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSpec {
    pub op: CalculationOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl CalculationSpec {
    pub fn count() -> Self {
        Self {
            op: CalculationOp::Count,
            column: None,
        }
    }

    pub fn of(op: CalculationOp, column: impl Into<String>) -> Self {
        Self {
            op,
            column: Some(column.into()),
        }
    }
}

/// A named expression evaluated per event, usable like a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedField {
    pub name: String,
    pub expression: String,
}

/// The value operand of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Number(f64),
    String(String),
    StringList(Vec<String>),
}

impl FilterValue {
    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::StringList(_))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::StringList(values)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Boolean(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::String(s) => f.write_str(s),
            FilterValue::StringList(values) => f.write_str(&values.join(",")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterSpec {
    /// Build a filter, checking the value shape against the operator.
    pub fn new(
        column: impl Into<String>,
        op: FilterOp,
        value: Option<FilterValue>,
    ) -> Result<Self, ApiError> {
        let filter = Self {
            column: column.into(),
            op,
            value,
        };
        filter.validate()?;
        Ok(filter)
    }

    /// A value-less filter (`exists` / `does-not-exist`).
    pub fn unary(column: impl Into<String>, op: FilterOp) -> Result<Self, ApiError> {
        Self::new(column, op, None)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let ok = match (&self.value, self.op.is_unary(), self.op.is_set()) {
            (None, true, _) => true,
            (Some(value), false, true) => value.is_list(),
            (Some(value), false, false) => !value.is_list(),
            _ => false,
        };
        if ok {
            return Ok(());
        }
        let expected = if self.op.is_unary() {
            "no value"
        } else if self.op.is_set() {
            "a list of values"
        } else {
            "a single value"
        };
        Err(ApiError::InvalidQuery(format!(
            "filter on {} with op {:?} takes {expected}",
            self.column, self.op
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<CalculationOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

impl OrderSpec {
    fn equivalent_to(&self, other: &OrderSpec) -> bool {
        self.column == other.column
            && self.op == other.op
            && self.order.unwrap_or_default() == other.order.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HavingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculate_op: Option<CalculationOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<HavingOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Relative offset for comparing a query against an earlier period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CompareTimeOffset(u32);

impl CompareTimeOffset {
    /// 30m, 1h, 2h, 8h, 24h, 7d, 28d and 182d.
    pub const ALLOWED: [u32; 8] = [1800, 3600, 7200, 28800, 86400, 604800, 2419200, 15724800];

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for CompareTimeOffset {
    type Error = ApiError;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&seconds) {
            Ok(Self(seconds))
        } else {
            Err(ApiError::InvalidQuery(format!(
                "compare_time_offset_seconds must be one of {:?}, got {seconds}",
                Self::ALLOWED
            )))
        }
    }
}

impl From<CompareTimeOffset> for u32 {
    fn from(offset: CompareTimeOffset) -> Self {
        offset.0
    }
}

// ---------------------------------------------------------------------------
// QuerySpec
// ---------------------------------------------------------------------------

/// A query specification as sent to and returned by the query API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calculations: Vec<CalculationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calculated_fields: Vec<CalculatedField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_combination: Option<FilterCombination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdowns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<OrderSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub havings: Vec<HavingSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_time_offset_seconds: Option<CompareTimeOffset>,
}

impl QuerySpec {
    /// Check local constraints before the query is sent.
    ///
    /// A time window is either relative (`time_range`) or absolute: setting
    /// `time_range` together with both `start_time` and `end_time` is
    /// rejected. Every filter must match its operator's arity.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.time_range.is_some() && self.start_time.is_some() && self.end_time.is_some() {
            return Err(ApiError::InvalidQuery(
                "time_range cannot be combined with both start_time and end_time".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(ApiError::InvalidQuery(
                    "start_time must be before end_time".to_string(),
                ));
            }
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        for calculation in &self.calculations {
            if calculation.op.requires_column() && calculation.column.is_none() {
                return Err(ApiError::InvalidQuery(format!(
                    "calculation {:?} requires a column",
                    calculation.op
                )));
            }
        }
        Ok(())
    }

    /// Whether `self` and `other` describe the same query once server-side
    /// defaults are accounted for. Symmetric and side-effect free.
    pub fn equivalent_to(&self, other: &QuerySpec) -> bool {
        calculations_equivalent(&self.calculations, &other.calculations)
            && orders_equivalent(&self.orders, &other.orders)
            && multiset_eq(&self.filters, &other.filters)
            && self.filter_combination.unwrap_or_default()
                == other.filter_combination.unwrap_or_default()
            && self.breakdowns.as_deref().unwrap_or_default()
                == other.breakdowns.as_deref().unwrap_or_default()
            && multiset_eq(&self.havings, &other.havings)
            && self.limit.unwrap_or(DEFAULT_LIMIT) == other.limit.unwrap_or(DEFAULT_LIMIT)
            && self.time_range.unwrap_or(DEFAULT_TIME_RANGE)
                == other.time_range.unwrap_or(DEFAULT_TIME_RANGE)
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.granularity.unwrap_or(DEFAULT_GRANULARITY)
                == other.granularity.unwrap_or(DEFAULT_GRANULARITY)
            && self.compare_time_offset_seconds == other.compare_time_offset_seconds
    }
}

/// No calculations means a single `COUNT`.
fn calculations_equivalent(a: &[CalculationSpec], b: &[CalculationSpec]) -> bool {
    if a == b {
        return true;
    }
    let implicit = [CalculationSpec::count()];
    let a = if a.is_empty() { &implicit[..] } else { a };
    let b = if b.is_empty() { &implicit[..] } else { b };
    a == b
}

fn orders_equivalent(a: &[OrderSpec], b: &[OrderSpec]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent_to(y))
}

/// Order-insensitive comparison that respects multiplicity.
fn multiset_eq<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let count = |items: &[T], needle: &T| items.iter().filter(|item| *item == needle).count();
    a.iter().all(|item| count(a, item) == count(b, item))
        && b.iter().all(|item| count(a, item) == count(b, item))
}
