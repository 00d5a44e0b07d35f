//! Articles, pages and FAQs.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::rules::{assign, assign_nullable, canonical_status, not_blank, valid_slug};
use crate::db::{AggregateSchema, SortOrder};
use crate::entities::article::{self, PublicationStatus};
use crate::entities::{faq, page};
use crate::errors::ServiceError;
use crate::services::repository::{CrudResource, WriteContext};

fn publication_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<PublicationStatus>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("status");
        error.message = Some("The status must be one of draft, published or archived.".into());
        error
    })
}

fn default_status() -> String {
    PublicationStatus::Draft.to_string()
}

/// First publication time: set when a record becomes published, kept afterwards.
fn published_at(
    status: &str,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (status.parse::<PublicationStatus>(), previous) {
        (_, Some(at)) => Some(at),
        (Ok(PublicationStatus::Published), None) => Some(now),
        _ => None,
    }
}

// Articles

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: String,
    #[validate(length(max = 255), custom = "valid_slug")]
    pub slug: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom = "not_blank")]
    pub body: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub author_id: Option<Uuid>,
    #[serde(default = "default_status")]
    #[validate(custom = "publication_status")]
    pub status: String,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(length(max = 255), custom = "valid_slug")]
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom = "not_blank")]
    pub body: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub author_id: Option<Uuid>,
    #[validate(custom = "publication_status")]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub author_id: Option<Uuid>,
}

pub struct Articles;

impl CrudResource for Articles {
    type Entity = article::Entity;
    type Model = article::Model;
    type ActiveModel = article::ActiveModel;
    type Column = article::Column;
    type View = article::Model;
    type Create = CreateArticleRequest;
    type Update = UpdateArticleRequest;
    type Filter = ArticleFilter;

    const NAME: &'static str = "articles";
    const LABEL: &'static str = "article";
    const PLURAL: &'static str = "articles";

    fn id_column() -> article::Column {
        article::Column::Id
    }

    fn model_id(model: &article::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [article::Column] {
        &[
            article::Column::Title,
            article::Column::Excerpt,
            article::Column::Body,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<article::Column> {
        AggregateSchema {
            created_at: article::Column::CreatedAt,
            status: Some(article::Column::Status),
            measures: &[],
            dimensions: &["status", "category"],
        }
    }

    fn filter_condition(filter: &ArticleFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(article::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(category) = &filter.category {
            condition = condition.add(article::Column::Category.eq(category.trim()));
        }
        if let Some(author_id) = filter.author_id {
            condition = condition.add(article::Column::AuthorId.eq(author_id));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<PublicationStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateArticleRequest,
    ) -> Result<article::ActiveModel, ServiceError> {
        let status = Self::normalize_status(&input.status)?;
        Ok(article::ActiveModel {
            id: Set(id),
            title: Set(input.title.trim().to_string()),
            slug: Set(input.slug),
            excerpt: Set(input.excerpt),
            body: Set(input.body),
            category: Set(input.category),
            author_id: Set(input.author_id),
            published_at: Set(published_at(&status, None, ctx.now)),
            status: Set(status),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: article::Model,
        input: &UpdateArticleRequest,
    ) -> Result<article::ActiveModel, ServiceError> {
        let status = match &input.status {
            Some(raw) => Self::normalize_status(raw)?,
            None => model.status.clone(),
        };
        let first_published = published_at(&status, model.published_at, ctx.now);

        let mut active = model.into_active_model();
        assign(&mut active.title, &input.title);
        assign(&mut active.slug, &input.slug);
        assign_nullable(&mut active.excerpt, &input.excerpt);
        assign(&mut active.body, &input.body);
        assign_nullable(&mut active.category, &input.category);
        assign_nullable(&mut active.author_id, &input.author_id);
        active.status = Set(status);
        active.published_at = Set(first_published);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

// Pages

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreatePageRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: String,
    #[validate(length(max = 255), custom = "valid_slug")]
    pub slug: String,
    #[validate(custom = "not_blank")]
    pub body: String,
    #[validate(length(max = 160, message = "The meta description may not be greater than 160 characters."))]
    pub meta_description: Option<String>,
    #[serde(default = "default_status")]
    #[validate(custom = "publication_status")]
    pub status: String,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdatePageRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(length(max = 255), custom = "valid_slug")]
    pub slug: Option<String>,
    #[validate(custom = "not_blank")]
    pub body: Option<String>,
    #[validate(length(max = 160, message = "The meta description may not be greater than 160 characters."))]
    pub meta_description: Option<String>,
    #[validate(custom = "publication_status")]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageFilter {
    pub status: Option<String>,
}

pub struct Pages;

impl CrudResource for Pages {
    type Entity = page::Entity;
    type Model = page::Model;
    type ActiveModel = page::ActiveModel;
    type Column = page::Column;
    type View = page::Model;
    type Create = CreatePageRequest;
    type Update = UpdatePageRequest;
    type Filter = PageFilter;

    const NAME: &'static str = "pages";
    const LABEL: &'static str = "page";
    const PLURAL: &'static str = "pages";

    fn id_column() -> page::Column {
        page::Column::Id
    }

    fn model_id(model: &page::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [page::Column] {
        &[page::Column::Title, page::Column::Body]
    }

    fn aggregate_schema() -> AggregateSchema<page::Column> {
        AggregateSchema {
            created_at: page::Column::CreatedAt,
            status: Some(page::Column::Status),
            measures: &[],
            dimensions: &["status"],
        }
    }

    fn filter_condition(filter: &PageFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(page::Column::Status.eq(Self::normalize_status(status)?));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<PublicationStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreatePageRequest,
    ) -> Result<page::ActiveModel, ServiceError> {
        Ok(page::ActiveModel {
            id: Set(id),
            title: Set(input.title.trim().to_string()),
            slug: Set(input.slug),
            body: Set(input.body),
            meta_description: Set(input.meta_description),
            status: Set(Self::normalize_status(&input.status)?),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: page::Model,
        input: &UpdatePageRequest,
    ) -> Result<page::ActiveModel, ServiceError> {
        let status = input
            .status
            .as_deref()
            .map(Self::normalize_status)
            .transpose()?;

        let mut active = model.into_active_model();
        assign(&mut active.title, &input.title);
        assign(&mut active.slug, &input.slug);
        assign(&mut active.body, &input.body);
        assign_nullable(&mut active.meta_description, &input.meta_description);
        assign(&mut active.status, &status);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

// FAQs

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateFaqRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub question: String,
    #[validate(custom = "not_blank")]
    pub answer: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "The position must be at least 0."))]
    pub position: i32,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateFaqRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub question: Option<String>,
    #[validate(custom = "not_blank")]
    pub answer: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "The position must be at least 0."))]
    pub position: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FaqFilter {
    pub category: Option<String>,
    pub is_published: Option<bool>,
}

pub struct Faqs;

impl CrudResource for Faqs {
    type Entity = faq::Entity;
    type Model = faq::Model;
    type ActiveModel = faq::ActiveModel;
    type Column = faq::Column;
    type View = faq::Model;
    type Create = CreateFaqRequest;
    type Update = UpdateFaqRequest;
    type Filter = FaqFilter;

    const NAME: &'static str = "faqs";
    const LABEL: &'static str = "FAQ";
    const PLURAL: &'static str = "FAQs";

    fn id_column() -> faq::Column {
        faq::Column::Id
    }

    fn model_id(model: &faq::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [faq::Column] {
        &[faq::Column::Question, faq::Column::Answer]
    }

    fn aggregate_schema() -> AggregateSchema<faq::Column> {
        AggregateSchema {
            created_at: faq::Column::CreatedAt,
            status: None,
            measures: &["position"],
            dimensions: &["category"],
        }
    }

    fn default_sort() -> (faq::Column, SortOrder) {
        (faq::Column::Position, SortOrder::Asc)
    }

    fn filter_condition(filter: &FaqFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(category) = &filter.category {
            condition = condition.add(faq::Column::Category.eq(category.trim()));
        }
        if let Some(published) = filter.is_published {
            condition = condition.add(faq::Column::IsPublished.eq(published));
        }
        Ok(condition)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateFaqRequest,
    ) -> Result<faq::ActiveModel, ServiceError> {
        Ok(faq::ActiveModel {
            id: Set(id),
            question: Set(input.question.trim().to_string()),
            answer: Set(input.answer),
            category: Set(input.category),
            position: Set(input.position),
            is_published: Set(input.is_published),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: faq::Model,
        input: &UpdateFaqRequest,
    ) -> Result<faq::ActiveModel, ServiceError> {
        let mut active = model.into_active_model();
        assign(&mut active.question, &input.question);
        assign(&mut active.answer, &input.answer);
        assign_nullable(&mut active.category, &input.category);
        assign(&mut active.position, &input.position);
        assign(&mut active.is_published, &input.is_published);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn publication_time_is_set_once() {
        let first = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(published_at("draft", None, first), None);
        assert_eq!(published_at("published", None, first), Some(first));
        assert_eq!(published_at("published", Some(first), later), Some(first));
        assert_eq!(published_at("archived", Some(first), later), Some(first));
    }

    #[test]
    fn article_payload_rejects_bad_slug_and_status() {
        let request: CreateArticleRequest = serde_json::from_str(
            r#"{"title": "Solar", "slug": "Solar News", "body": "text", "status": "live"}"#,
        )
        .unwrap();
        let err = ServiceError::from(request.validate().unwrap_err());
        match err {
            ServiceError::ValidationFailed(fields) => {
                assert!(fields.contains_key("slug"));
                assert!(fields.contains_key("status"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
