use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, Condition, Order};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Listing parameters shared by every collection endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuery {
    /// 1-based page; anything below 1 is treated as the first page.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self, default: u64, max: u64) -> u64 {
        self.per_page.unwrap_or(default).clamp(1, max.max(1))
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Resolves `sort_by` to a column of the entity, falling back to `default`.
    pub fn sort_column<C>(&self, default: C) -> Result<C, ServiceError>
    where
        C: ColumnTrait + std::str::FromStr,
    {
        match self.sort_by.as_deref() {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse::<C>().map_err(|_| {
                ServiceError::field("sort_by", format!("Cannot sort by unknown field '{}'.", raw))
            }),
        }
    }
}

/// One page of a listing together with the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1)).max(1)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Helper for building case-insensitive free-text search conditions
#[derive(Debug, Default)]
pub struct SearchBuilder {
    conditions: Vec<Condition>,
}

impl SearchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches rows whose column contains `term`, ignoring case.
    pub fn add_like<C: ColumnTrait>(mut self, column: C, term: &str) -> Self {
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let lowered = Expr::expr(Func::lower(Expr::col((column.entity_name(), column))));
            self.conditions.push(Condition::all().add(lowered.like(pattern)));
        }
        self
    }

    pub fn add_columns<C: ColumnTrait>(self, columns: &[C], term: &str) -> Self {
        columns
            .iter()
            .fold(self, |builder, column| builder.add_like(*column, term))
    }

    /// Any of the added conditions; `None` when nothing was added.
    pub fn build(self) -> Option<Condition> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(
                self.conditions
                    .into_iter()
                    .fold(Condition::any(), |acc, cond| acc.add(cond)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::article;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    #[test]
    fn page_and_per_page_are_clamped() {
        let query = ListQuery {
            page: Some(0),
            per_page: Some(500),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(20, 100), 100);

        let query = ListQuery {
            per_page: Some(0),
            ..Default::default()
        };
        assert_eq!(query.per_page(20, 100), 1);
        assert_eq!(ListQuery::default().per_page(20, 100), 20);
    }

    #[test]
    fn last_page_rounds_up() {
        let page = Page {
            items: vec![(); 10],
            total: 25,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.last_page(), 3);

        let empty: Page<()> = Page {
            items: vec![],
            total: 0,
            page: 1,
            per_page: 10,
        };
        assert_eq!(empty.last_page(), 1);
    }

    #[test]
    fn unknown_sort_column_is_a_field_error() {
        let query = ListQuery {
            sort_by: Some("password".to_string()),
            ..Default::default()
        };
        let err = query
            .sort_column(article::Column::CreatedAt)
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationFailed(fields) if fields.contains_key("sort_by")));

        let query = ListQuery {
            sort_by: Some("title".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.sort_column(article::Column::CreatedAt),
            Ok(article::Column::Title)
        ));
    }

    #[test]
    fn search_spans_columns_with_or() {
        let condition = SearchBuilder::new()
            .add_columns(&[article::Column::Title, article::Column::Body], "Solar")
            .build()
            .unwrap();
        let sql = article::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains("LOWER(\"articles\".\"title\") LIKE '%solar%'"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn blank_search_adds_nothing() {
        assert!(SearchBuilder::new()
            .add_like(article::Column::Title, "")
            .build()
            .is_none());
    }
}
