//! Products, providers and municipalities.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::rules::{assign, assign_nullable, non_negative, not_blank};
use crate::db::{AggregateSchema, SortOrder};
use crate::entities::{municipality, product, provider};
use crate::errors::ServiceError;
use crate::services::repository::{CrudResource, WriteContext};

fn default_unit() -> String {
    "unit".to_string()
}

fn default_true() -> bool {
    true
}

// Products

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "The SKU must be between 1 and 64 characters."))]
    pub sku: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub category: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default = "default_unit")]
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    pub provider_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "The SKU must be between 1 and 64 characters."))]
    pub sku: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub category: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    pub provider_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub provider_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

pub struct Products;

impl CrudResource for Products {
    type Entity = product::Entity;
    type Model = product::Model;
    type ActiveModel = product::ActiveModel;
    type Column = product::Column;
    type View = product::Model;
    type Create = CreateProductRequest;
    type Update = UpdateProductRequest;
    type Filter = ProductFilter;

    const NAME: &'static str = "products";
    const LABEL: &'static str = "product";
    const PLURAL: &'static str = "products";

    fn id_column() -> product::Column {
        product::Column::Id
    }

    fn model_id(model: &product::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [product::Column] {
        &[
            product::Column::Name,
            product::Column::Sku,
            product::Column::Description,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<product::Column> {
        AggregateSchema {
            created_at: product::Column::CreatedAt,
            status: None,
            measures: &["price"],
            dimensions: &["category", "unit"],
        }
    }

    fn filter_condition(filter: &ProductFilter) -> Result<Condition, ServiceError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ServiceError::field(
                    "min_price",
                    "The minimum price may not be greater than the maximum price.",
                ));
            }
        }

        let mut condition = Condition::all();
        if let Some(category) = &filter.category {
            condition = condition.add(product::Column::Category.eq(category.trim()));
        }
        if let Some(provider_id) = filter.provider_id {
            condition = condition.add(product::Column::ProviderId.eq(provider_id));
        }
        if let Some(active) = filter.is_active {
            condition = condition.add(product::Column::IsActive.eq(active));
        }
        if let Some(min) = filter.min_price {
            condition = condition.add(product::Column::Price.gte(min));
        }
        if let Some(max) = filter.max_price {
            condition = condition.add(product::Column::Price.lte(max));
        }
        Ok(condition)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateProductRequest,
    ) -> Result<product::ActiveModel, ServiceError> {
        Ok(product::ActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            sku: Set(input.sku.trim().to_string()),
            description: Set(input.description),
            category: Set(input.category.trim().to_string()),
            price: Set(input.price),
            unit: Set(input.unit),
            provider_id: Set(input.provider_id),
            is_active: Set(input.is_active),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: product::Model,
        input: &UpdateProductRequest,
    ) -> Result<product::ActiveModel, ServiceError> {
        let mut active = model.into_active_model();
        assign(&mut active.name, &input.name);
        assign(&mut active.sku, &input.sku.as_ref().map(|sku| sku.trim().to_string()));
        assign_nullable(&mut active.description, &input.description);
        assign(&mut active.category, &input.category);
        assign(&mut active.price, &input.price);
        assign(&mut active.unit, &input.unit);
        assign_nullable(&mut active.provider_id, &input.provider_id);
        assign(&mut active.is_active, &input.is_active);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

// Providers

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateProviderRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(url(message = "The website must be a valid URL."))]
    pub website: Option<String>,
    #[validate(length(min = 1, max = 64), custom = "not_blank")]
    pub provider_type: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateProviderRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(url(message = "The website must be a valid URL."))]
    pub website: Option<String>,
    #[validate(length(min = 1, max = 64), custom = "not_blank")]
    pub provider_type: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderFilter {
    pub provider_type: Option<String>,
    pub is_active: Option<bool>,
}

pub struct Providers;

impl CrudResource for Providers {
    type Entity = provider::Entity;
    type Model = provider::Model;
    type ActiveModel = provider::ActiveModel;
    type Column = provider::Column;
    type View = provider::Model;
    type Create = CreateProviderRequest;
    type Update = UpdateProviderRequest;
    type Filter = ProviderFilter;

    const NAME: &'static str = "providers";
    const LABEL: &'static str = "provider";
    const PLURAL: &'static str = "providers";

    fn id_column() -> provider::Column {
        provider::Column::Id
    }

    fn model_id(model: &provider::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [provider::Column] {
        &[provider::Column::Name, provider::Column::Email]
    }

    fn aggregate_schema() -> AggregateSchema<provider::Column> {
        AggregateSchema {
            created_at: provider::Column::CreatedAt,
            status: None,
            measures: &[],
            dimensions: &["provider_type"],
        }
    }

    fn default_sort() -> (provider::Column, SortOrder) {
        (provider::Column::Name, SortOrder::Asc)
    }

    fn filter_condition(filter: &ProviderFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(kind) = &filter.provider_type {
            condition = condition.add(provider::Column::ProviderType.eq(kind.trim()));
        }
        if let Some(active) = filter.is_active {
            condition = condition.add(provider::Column::IsActive.eq(active));
        }
        Ok(condition)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateProviderRequest,
    ) -> Result<provider::ActiveModel, ServiceError> {
        Ok(provider::ActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email),
            phone: Set(input.phone),
            website: Set(input.website),
            provider_type: Set(input.provider_type.trim().to_string()),
            is_active: Set(input.is_active),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: provider::Model,
        input: &UpdateProviderRequest,
    ) -> Result<provider::ActiveModel, ServiceError> {
        let mut active = model.into_active_model();
        assign(&mut active.name, &input.name);
        assign_nullable(&mut active.email, &input.email);
        assign_nullable(&mut active.phone, &input.phone);
        assign_nullable(&mut active.website, &input.website);
        assign(&mut active.provider_type, &input.provider_type);
        assign(&mut active.is_active, &input.is_active);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

// Municipalities

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateMunicipalityRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: String,
    #[validate(length(max = 100))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 12))]
    pub postal_code_prefix: Option<String>,
    #[validate(range(min = 0, message = "The population must be at least 0."))]
    pub population: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateMunicipalityRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 12))]
    pub postal_code_prefix: Option<String>,
    #[validate(range(min = 0, message = "The population must be at least 0."))]
    pub population: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MunicipalityFilter {
    pub province: Option<String>,
    pub postal_code_prefix: Option<String>,
}

pub struct Municipalities;

impl CrudResource for Municipalities {
    type Entity = municipality::Entity;
    type Model = municipality::Model;
    type ActiveModel = municipality::ActiveModel;
    type Column = municipality::Column;
    type View = municipality::Model;
    type Create = CreateMunicipalityRequest;
    type Update = UpdateMunicipalityRequest;
    type Filter = MunicipalityFilter;

    const NAME: &'static str = "municipalities";
    const LABEL: &'static str = "municipality";
    const PLURAL: &'static str = "municipalities";

    fn id_column() -> municipality::Column {
        municipality::Column::Id
    }

    fn model_id(model: &municipality::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [municipality::Column] {
        &[municipality::Column::Name, municipality::Column::Province]
    }

    fn aggregate_schema() -> AggregateSchema<municipality::Column> {
        AggregateSchema {
            created_at: municipality::Column::CreatedAt,
            status: None,
            measures: &["population"],
            dimensions: &["province"],
        }
    }

    fn default_sort() -> (municipality::Column, SortOrder) {
        (municipality::Column::Name, SortOrder::Asc)
    }

    fn filter_condition(filter: &MunicipalityFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(province) = &filter.province {
            condition = condition.add(municipality::Column::Province.eq(province.trim()));
        }
        if let Some(prefix) = &filter.postal_code_prefix {
            condition = condition.add(municipality::Column::PostalCodePrefix.eq(prefix.trim()));
        }
        Ok(condition)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateMunicipalityRequest,
    ) -> Result<municipality::ActiveModel, ServiceError> {
        Ok(municipality::ActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            province: Set(input.province),
            postal_code_prefix: Set(input.postal_code_prefix),
            population: Set(input.population),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: municipality::Model,
        input: &UpdateMunicipalityRequest,
    ) -> Result<municipality::ActiveModel, ServiceError> {
        let mut active = model.into_active_model();
        assign(&mut active.name, &input.name);
        assign_nullable(&mut active.province, &input.province);
        assign_nullable(&mut active.postal_code_prefix, &input.postal_code_prefix);
        assign_nullable(&mut active.population, &input.population);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn product_defaults() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{"name": "Panel", "sku": "PV-400", "category": "solar", "price": 199.9}"#,
        )
        .unwrap();
        assert_eq!(request.unit, "unit");
        assert!(request.is_active);
        assert_eq!(request.price, dec!(199.9));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let filter = ProductFilter {
            min_price: Some(dec!(50)),
            max_price: Some(dec!(10)),
            ..Default::default()
        };
        assert!(Products::filter_condition(&filter).is_err());
    }

    #[test]
    fn provider_website_must_be_a_url() {
        let request: CreateProviderRequest = serde_json::from_str(
            r#"{"name": "SolCoop", "provider_type": "installer", "website": "not a url"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
