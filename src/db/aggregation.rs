//! Grouped statistics over any entity: `F(column)` per dimension or date bucket.
//!
//! Column names arrive from query strings, so every measure and dimension is checked
//! against a per-resource whitelist before it reaches SQL.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Asterisk, Expr, Func, Iden, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

use super::query_builder::SortOrder;
use crate::errors::{FieldErrors, ServiceError};

pub const MAX_AGGREGATE_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DatePeriod {
    Day,
    Month,
    Year,
}

impl DatePeriod {
    fn strftime_format(self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
            Self::Year => "%Y",
        }
    }

    fn to_char_format(self) -> &'static str {
        match self {
            Self::Day => "YYYY-MM-DD",
            Self::Month => "YYYY-MM",
            Self::Year => "YYYY",
        }
    }
}

/// Raw `/stats` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateParams {
    pub metric: Option<AggregateFunction>,
    pub column: Option<String>,
    pub group_by: Option<String>,
    pub period: Option<DatePeriod>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy)]
pub enum Dimension<C> {
    Total,
    Column(C),
    Period(DatePeriod),
}

/// Validated aggregation over the columns `C` of one entity.
#[derive(Debug, Clone)]
pub struct AggregateRequest<C> {
    pub function: AggregateFunction,
    pub measure: Option<C>,
    pub dimension: Dimension<C>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub limit: u64,
    pub order: Option<SortOrder>,
}

/// Per-entity columns the aggregation endpoint may touch.
#[derive(Debug, Clone, Copy)]
pub struct AggregateSchema<C: 'static> {
    pub created_at: C,
    pub status: Option<C>,
    pub measures: &'static [&'static str],
    pub dimensions: &'static [&'static str],
}

fn whitelisted<C>(raw: &str, allowed: &[&str], field: &str, errors: &mut FieldErrors) -> Option<C>
where
    C: FromStr,
{
    let parsed = allowed
        .iter()
        .any(|name| *name == raw)
        .then(|| raw.parse::<C>().ok())
        .flatten();
    if parsed.is_none() {
        errors.entry(field.to_string()).or_default().push(if allowed.is_empty() {
            format!("The {} parameter is not supported for this resource.", field)
        } else {
            format!(
                "The {} must be one of: {}.",
                field,
                allowed.join(", ")
            )
        });
    }
    parsed
}

impl AggregateParams {
    pub fn resolve<C>(self, schema: &AggregateSchema<C>) -> Result<AggregateRequest<C>, ServiceError>
    where
        C: ColumnTrait + FromStr,
    {
        let mut errors = FieldErrors::new();
        let function = self.metric.unwrap_or_default();

        let measure = match (function, self.column.as_deref()) {
            (AggregateFunction::Count, None) => None,
            (_, Some(raw)) => whitelisted(raw, schema.measures, "column", &mut errors),
            (_, None) => {
                errors.entry("column".to_string()).or_default().push(format!(
                    "The column is required for the {} metric.",
                    function
                ));
                None
            }
        };

        let dimension = match (self.group_by.as_deref(), self.period) {
            (Some(_), Some(_)) => {
                errors
                    .entry("group_by".to_string())
                    .or_default()
                    .push("The group_by and period parameters cannot be combined.".to_string());
                Dimension::Total
            }
            (Some(raw), None) => whitelisted(raw, schema.dimensions, "group_by", &mut errors)
                .map(Dimension::Column)
                .unwrap_or(Dimension::Total),
            (None, Some(period)) => Dimension::Period(period),
            (None, None) => Dimension::Total,
        };

        if self.status.is_some() && schema.status.is_none() {
            errors
                .entry("status".to_string())
                .or_default()
                .push("This resource has no status to filter on.".to_string());
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                errors
                    .entry("from".to_string())
                    .or_default()
                    .push("The from date must be before the to date.".to_string());
            }
        }

        let limit = self.limit.unwrap_or(MAX_AGGREGATE_LIMIT);
        if !(1..=MAX_AGGREGATE_LIMIT).contains(&limit) {
            errors
                .entry("limit".to_string())
                .or_default()
                .push(format!("The limit must be between 1 and {}.", MAX_AGGREGATE_LIMIT));
        }

        if !errors.is_empty() {
            return Err(ServiceError::ValidationFailed(errors));
        }

        Ok(AggregateRequest {
            function,
            measure,
            dimension,
            from: self.from,
            to: self.to,
            status: self.status,
            limit,
            order: self.order,
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct AggregateRow {
    pub bucket: Option<String>,
    pub metric: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub bucket: Option<String>,
    pub value: f64,
}

impl From<AggregateRow> for AggregateBucket {
    fn from(row: AggregateRow) -> Self {
        Self {
            bucket: row.bucket,
            value: row.metric.unwrap_or(0.0),
        }
    }
}

fn qualified<C: ColumnTrait>(column: C) -> Expr {
    Expr::col((column.entity_name(), column))
}

fn date_bucket<C: ColumnTrait>(backend: DbBackend, column: C, period: DatePeriod) -> SimpleExpr {
    let table = column.entity_name().to_string();
    let name = column.as_str();
    match backend {
        DbBackend::Sqlite => Expr::cust(format!(
            "strftime('{}', \"{}\".\"{}\")",
            period.strftime_format(),
            table,
            name
        )),
        DbBackend::Postgres => Expr::cust(format!(
            "to_char(\"{}\".\"{}\" AT TIME ZONE 'UTC', '{}')",
            table,
            name,
            period.to_char_format()
        )),
        DbBackend::MySql => Expr::cust(format!(
            "CAST(`{}`.`{}` AS CHAR)",
            table, name
        )),
    }
}

fn metric_expr<C: ColumnTrait>(function: AggregateFunction, measure: Option<C>) -> SimpleExpr {
    let value: SimpleExpr = match (function, measure) {
        (AggregateFunction::Count, None) => Func::count(Expr::col(Asterisk)).into(),
        (AggregateFunction::Count, Some(column)) => Func::count(qualified(column)).into(),
        (AggregateFunction::Sum, Some(column)) => Func::sum(qualified(column)).into(),
        (AggregateFunction::Avg, Some(column)) => Func::avg(qualified(column)).into(),
        (AggregateFunction::Min, Some(column)) => Func::min(qualified(column)).into(),
        (AggregateFunction::Max, Some(column)) => Func::max(qualified(column)).into(),
        // resolve() never yields a measured function without a column
        (_, None) => Func::count(Expr::col(Asterisk)).into(),
    };
    Func::cast_as(value, Alias::new("DOUBLE PRECISION")).into()
}

/// Runs `request` against entity `E`.
pub async fn aggregate<E, C>(
    db: &C,
    schema: &AggregateSchema<E::Column>,
    request: AggregateRequest<E::Column>,
) -> Result<Vec<AggregateBucket>, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let mut query = E::find().select_only();

    let bucket = match request.dimension {
        Dimension::Total => None,
        Dimension::Column(column) => {
            Some(SimpleExpr::from(Func::cast_as(qualified(column), Alias::new("TEXT"))))
        }
        Dimension::Period(period) => Some(date_bucket(backend, schema.created_at, period)),
    };

    query = match &bucket {
        Some(expr) => query.column_as(expr.clone(), "bucket").group_by(expr.clone()),
        None => query.column_as(Expr::cust("CAST(NULL AS TEXT)"), "bucket"),
    };
    query = query.column_as(metric_expr(request.function, request.measure), "metric");

    if let Some(from) = request.from {
        query = query.filter(schema.created_at.gte(from));
    }
    if let Some(to) = request.to {
        query = query.filter(schema.created_at.lte(to));
    }
    if let (Some(status_column), Some(status)) = (schema.status, request.status) {
        query = query.filter(status_column.eq(status));
    }

    let metric = SimpleExpr::from(Expr::col(Alias::new("metric")));
    let bucket_order = SimpleExpr::from(Expr::col(Alias::new("bucket")));
    query = match (request.order, request.dimension) {
        (Some(order), _) => query.order_by(metric, order.into()).order_by_asc(bucket_order),
        (None, Dimension::Period(_)) => query.order_by_asc(bucket_order),
        (None, _) => query.order_by_desc(metric).order_by_asc(bucket_order),
    };

    let rows = query
        .limit(request.limit)
        .into_model::<AggregateRow>()
        .all(db)
        .await?;

    Ok(rows.into_iter().map(AggregateBucket::from).collect())
}
