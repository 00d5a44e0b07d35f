//! Energy bonds, carbon credits and donations.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::rules::{
    assign, assign_nullable, canonical_status, non_negative, not_blank, percentage, positive,
    valid_currency,
};
use crate::db::AggregateSchema;
use crate::entities::carbon_credit::{self, CreditStatus};
use crate::entities::donation::{self, DonationStatus};
use crate::entities::energy_bond::{self, BondStatus};
use crate::errors::ServiceError;
use crate::services::repository::{CrudResource, WriteContext};
use crate::services::workflow::WorkflowResource;
use crate::workflow::TransitionStamp;

// Energy bonds

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateEnergyBondRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    #[validate(custom = "positive")]
    pub nominal_amount: Decimal,
    #[validate(custom = "percentage")]
    pub interest_rate: Decimal,
    #[validate(range(min = 1, max = 600, message = "The term must be between 1 and 600 months."))]
    pub term_months: i32,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateEnergyBondRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub provider_id: Option<Uuid>,
    #[validate(custom = "positive")]
    pub nominal_amount: Option<Decimal>,
    #[validate(custom = "percentage")]
    pub interest_rate: Option<Decimal>,
    #[validate(range(min = 1, max = 600, message = "The term must be between 1 and 600 months."))]
    pub term_months: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnergyBondFilter {
    pub status: Option<String>,
    pub provider_id: Option<Uuid>,
}

pub struct EnergyBonds;

impl CrudResource for EnergyBonds {
    type Entity = energy_bond::Entity;
    type Model = energy_bond::Model;
    type ActiveModel = energy_bond::ActiveModel;
    type Column = energy_bond::Column;
    type View = energy_bond::Model;
    type Create = CreateEnergyBondRequest;
    type Update = UpdateEnergyBondRequest;
    type Filter = EnergyBondFilter;

    const NAME: &'static str = "energy-bonds";
    const LABEL: &'static str = "energy bond";
    const PLURAL: &'static str = "energy bonds";

    fn id_column() -> energy_bond::Column {
        energy_bond::Column::Id
    }

    fn model_id(model: &energy_bond::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [energy_bond::Column] {
        &[energy_bond::Column::Title, energy_bond::Column::Description]
    }

    fn aggregate_schema() -> AggregateSchema<energy_bond::Column> {
        AggregateSchema {
            created_at: energy_bond::Column::CreatedAt,
            status: Some(energy_bond::Column::Status),
            measures: &["nominal_amount", "interest_rate", "term_months"],
            dimensions: &["status", "term_months"],
        }
    }

    fn filter_condition(filter: &EnergyBondFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(energy_bond::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(provider_id) = filter.provider_id {
            condition = condition.add(energy_bond::Column::ProviderId.eq(provider_id));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<BondStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateEnergyBondRequest,
    ) -> Result<energy_bond::ActiveModel, ServiceError> {
        Ok(energy_bond::ActiveModel {
            id: Set(id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            provider_id: Set(input.provider_id),
            nominal_amount: Set(input.nominal_amount),
            interest_rate: Set(input.interest_rate),
            term_months: Set(input.term_months),
            status: Set(BondStatus::Pending.to_string()),
            version: Set(1),
            approved_by: Set(None),
            approved_at: Set(None),
            rejected_by: Set(None),
            rejected_at: Set(None),
            rejection_reason: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: energy_bond::Model,
        input: &UpdateEnergyBondRequest,
    ) -> Result<energy_bond::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.title, &input.title);
        assign_nullable(&mut active.description, &input.description);
        assign_nullable(&mut active.provider_id, &input.provider_id);
        assign(&mut active.nominal_amount, &input.nominal_amount);
        assign(&mut active.interest_rate, &input.interest_rate);
        assign(&mut active.term_months, &input.term_months);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &energy_bond::Model) -> Option<sea_orm::sea_query::SimpleExpr> {
        Some(energy_bond::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for EnergyBonds {
    type State = BondStatus;

    fn status_column() -> energy_bond::Column {
        energy_bond::Column::Status
    }

    fn version_column() -> energy_bond::Column {
        energy_bond::Column::Version
    }

    fn stored_status(model: &energy_bond::Model) -> &str {
        &model.status
    }

    fn version(model: &energy_bond::Model) -> i32 {
        model.version
    }

    fn transitioned(
        model: energy_bond::Model,
        to: BondStatus,
        stamp: &TransitionStamp,
    ) -> energy_bond::ActiveModel {
        let mut active = energy_bond::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match to {
            BondStatus::Approved => {
                active.approved_by = Set(Some(stamp.actor));
                active.approved_at = Set(Some(stamp.at));
            }
            BondStatus::Rejected => {
                active.rejected_by = Set(Some(stamp.actor));
                active.rejected_at = Set(Some(stamp.at));
                active.rejection_reason = Set(stamp.note.clone());
            }
            BondStatus::Cancelled => {
                active.cancelled_by = Set(Some(stamp.actor));
                active.cancelled_at = Set(Some(stamp.at));
            }
            BondStatus::Pending => {}
        }
        active
    }
}

// Carbon credits

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateCarbonCreditRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub project_name: String,
    #[validate(length(max = 100))]
    pub registry_reference: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub credit_type: String,
    #[validate(custom = "positive")]
    pub tonnes_co2: Decimal,
    #[validate(custom = "non_negative")]
    pub price_per_tonne: Decimal,
    #[validate(range(min = 1990, max = 2100, message = "The vintage year must be between 1990 and 2100."))]
    pub vintage_year: i32,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateCarbonCreditRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub project_name: Option<String>,
    #[validate(length(max = 100))]
    pub registry_reference: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub credit_type: Option<String>,
    #[validate(custom = "positive")]
    pub tonnes_co2: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub price_per_tonne: Option<Decimal>,
    #[validate(range(min = 1990, max = 2100, message = "The vintage year must be between 1990 and 2100."))]
    pub vintage_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CarbonCreditFilter {
    pub status: Option<String>,
    pub credit_type: Option<String>,
    pub vintage_year: Option<i32>,
}

pub struct CarbonCredits;

impl CrudResource for CarbonCredits {
    type Entity = carbon_credit::Entity;
    type Model = carbon_credit::Model;
    type ActiveModel = carbon_credit::ActiveModel;
    type Column = carbon_credit::Column;
    type View = carbon_credit::Model;
    type Create = CreateCarbonCreditRequest;
    type Update = UpdateCarbonCreditRequest;
    type Filter = CarbonCreditFilter;

    const NAME: &'static str = "carbon-credits";
    const LABEL: &'static str = "carbon credit";
    const PLURAL: &'static str = "carbon credits";

    fn id_column() -> carbon_credit::Column {
        carbon_credit::Column::Id
    }

    fn model_id(model: &carbon_credit::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [carbon_credit::Column] {
        &[
            carbon_credit::Column::ProjectName,
            carbon_credit::Column::RegistryReference,
            carbon_credit::Column::CreditType,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<carbon_credit::Column> {
        AggregateSchema {
            created_at: carbon_credit::Column::CreatedAt,
            status: Some(carbon_credit::Column::Status),
            measures: &["tonnes_co2", "price_per_tonne"],
            dimensions: &["status", "credit_type", "vintage_year"],
        }
    }

    fn filter_condition(filter: &CarbonCreditFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition =
                condition.add(carbon_credit::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(credit_type) = &filter.credit_type {
            condition = condition.add(carbon_credit::Column::CreditType.eq(credit_type.trim()));
        }
        if let Some(year) = filter.vintage_year {
            condition = condition.add(carbon_credit::Column::VintageYear.eq(year));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<CreditStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateCarbonCreditRequest,
    ) -> Result<carbon_credit::ActiveModel, ServiceError> {
        Ok(carbon_credit::ActiveModel {
            id: Set(id),
            project_name: Set(input.project_name.trim().to_string()),
            registry_reference: Set(input.registry_reference),
            credit_type: Set(input.credit_type.trim().to_string()),
            tonnes_co2: Set(input.tonnes_co2),
            price_per_tonne: Set(input.price_per_tonne),
            vintage_year: Set(input.vintage_year),
            status: Set(CreditStatus::Pending.to_string()),
            version: Set(1),
            approved_by: Set(None),
            approved_at: Set(None),
            rejected_by: Set(None),
            rejected_at: Set(None),
            rejection_reason: Set(None),
            retired_by: Set(None),
            retired_at: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: carbon_credit::Model,
        input: &UpdateCarbonCreditRequest,
    ) -> Result<carbon_credit::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.project_name, &input.project_name);
        assign_nullable(&mut active.registry_reference, &input.registry_reference);
        assign(&mut active.credit_type, &input.credit_type);
        assign(&mut active.tonnes_co2, &input.tonnes_co2);
        assign(&mut active.price_per_tonne, &input.price_per_tonne);
        assign(&mut active.vintage_year, &input.vintage_year);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &carbon_credit::Model) -> Option<sea_orm::sea_query::SimpleExpr> {
        Some(carbon_credit::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for CarbonCredits {
    type State = CreditStatus;

    fn status_column() -> carbon_credit::Column {
        carbon_credit::Column::Status
    }

    fn version_column() -> carbon_credit::Column {
        carbon_credit::Column::Version
    }

    fn stored_status(model: &carbon_credit::Model) -> &str {
        &model.status
    }

    fn version(model: &carbon_credit::Model) -> i32 {
        model.version
    }

    fn transitioned(
        model: carbon_credit::Model,
        to: CreditStatus,
        stamp: &TransitionStamp,
    ) -> carbon_credit::ActiveModel {
        let mut active = carbon_credit::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match to {
            CreditStatus::Approved => {
                active.approved_by = Set(Some(stamp.actor));
                active.approved_at = Set(Some(stamp.at));
            }
            CreditStatus::Rejected => {
                active.rejected_by = Set(Some(stamp.actor));
                active.rejected_at = Set(Some(stamp.at));
                active.rejection_reason = Set(stamp.note.clone());
            }
            CreditStatus::Retired => {
                active.retired_by = Set(Some(stamp.actor));
                active.retired_at = Set(Some(stamp.at));
            }
            CreditStatus::Pending => {}
        }
        active
    }
}

// Donations

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize, Validate, Serialize)]
pub struct CreateDonationRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub donor_name: String,
    #[validate(email(message = "The donor email must be a valid email address."))]
    pub donor_email: Option<String>,
    #[validate(custom = "positive")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    #[validate(custom = "valid_currency")]
    pub currency: String,
    #[validate(length(max = 255))]
    pub campaign: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, Serialize)]
pub struct UpdateDonationRequest {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub donor_name: Option<String>,
    #[validate(email(message = "The donor email must be a valid email address."))]
    pub donor_email: Option<String>,
    #[validate(custom = "positive")]
    pub amount: Option<Decimal>,
    #[validate(custom = "valid_currency")]
    pub currency: Option<String>,
    #[validate(length(max = 255))]
    pub campaign: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationFilter {
    pub status: Option<String>,
    pub campaign: Option<String>,
    pub currency: Option<String>,
}

pub struct Donations;

impl CrudResource for Donations {
    type Entity = donation::Entity;
    type Model = donation::Model;
    type ActiveModel = donation::ActiveModel;
    type Column = donation::Column;
    type View = donation::Model;
    type Create = CreateDonationRequest;
    type Update = UpdateDonationRequest;
    type Filter = DonationFilter;

    const NAME: &'static str = "donations";
    const LABEL: &'static str = "donation";
    const PLURAL: &'static str = "donations";

    fn id_column() -> donation::Column {
        donation::Column::Id
    }

    fn model_id(model: &donation::Model) -> Uuid {
        model.id
    }

    fn search_columns() -> &'static [donation::Column] {
        &[
            donation::Column::DonorName,
            donation::Column::DonorEmail,
            donation::Column::Campaign,
        ]
    }

    fn aggregate_schema() -> AggregateSchema<donation::Column> {
        AggregateSchema {
            created_at: donation::Column::CreatedAt,
            status: Some(donation::Column::Status),
            measures: &["amount"],
            dimensions: &["status", "campaign", "currency"],
        }
    }

    fn filter_condition(filter: &DonationFilter) -> Result<Condition, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(donation::Column::Status.eq(Self::normalize_status(status)?));
        }
        if let Some(campaign) = &filter.campaign {
            condition = condition.add(donation::Column::Campaign.eq(campaign.trim()));
        }
        if let Some(code) = &filter.currency {
            condition = condition.add(donation::Column::Currency.eq(code.trim().to_uppercase()));
        }
        Ok(condition)
    }

    fn normalize_status(raw: &str) -> Result<String, ServiceError> {
        canonical_status::<DonationStatus>(raw, Self::LABEL)
    }

    fn new_model(
        ctx: &WriteContext,
        id: Uuid,
        input: CreateDonationRequest,
    ) -> Result<donation::ActiveModel, ServiceError> {
        Ok(donation::ActiveModel {
            id: Set(id),
            donor_name: Set(input.donor_name.trim().to_string()),
            donor_email: Set(input.donor_email),
            amount: Set(input.amount),
            currency: Set(input.currency),
            campaign: Set(input.campaign),
            status: Set(DonationStatus::Pending.to_string()),
            version: Set(1),
            confirmed_by: Set(None),
            confirmed_at: Set(None),
            processed_by: Set(None),
            processed_at: Set(None),
            refunded_by: Set(None),
            refunded_at: Set(None),
            refund_reason: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            created_at: Set(ctx.now),
            updated_at: Set(ctx.now),
        })
    }

    fn apply_update(
        ctx: &WriteContext,
        model: donation::Model,
        input: &UpdateDonationRequest,
    ) -> Result<donation::ActiveModel, ServiceError> {
        let version = model.version;
        let mut active = model.into_active_model();
        assign(&mut active.donor_name, &input.donor_name);
        assign_nullable(&mut active.donor_email, &input.donor_email);
        assign(&mut active.amount, &input.amount);
        assign(&mut active.currency, &input.currency);
        assign_nullable(&mut active.campaign, &input.campaign);
        active.version = Set(version + 1);
        active.updated_at = Set(ctx.now);
        Ok(active)
    }

    fn version_guard(model: &donation::Model) -> Option<sea_orm::sea_query::SimpleExpr> {
        Some(donation::Column::Version.eq(model.version))
    }
}

impl WorkflowResource for Donations {
    type State = DonationStatus;

    fn status_column() -> donation::Column {
        donation::Column::Status
    }

    fn version_column() -> donation::Column {
        donation::Column::Version
    }

    fn stored_status(model: &donation::Model) -> &str {
        &model.status
    }

    fn version(model: &donation::Model) -> i32 {
        model.version
    }

    fn transitioned(
        model: donation::Model,
        to: DonationStatus,
        stamp: &TransitionStamp,
    ) -> donation::ActiveModel {
        let mut active = donation::ActiveModel {
            status: Set(to.to_string()),
            version: Set(model.version + 1),
            updated_at: Set(stamp.at),
            ..Default::default()
        };
        match to {
            DonationStatus::Confirmed => {
                active.confirmed_by = Set(Some(stamp.actor));
                active.confirmed_at = Set(Some(stamp.at));
            }
            DonationStatus::Processed => {
                active.processed_by = Set(Some(stamp.actor));
                active.processed_at = Set(Some(stamp.at));
            }
            DonationStatus::Refunded => {
                active.refunded_by = Set(Some(stamp.actor));
                active.refunded_at = Set(Some(stamp.at));
                active.refund_reason = Set(stamp.note.clone());
            }
            DonationStatus::Cancelled => {
                active.cancelled_by = Set(Some(stamp.actor));
                active.cancelled_at = Set(Some(stamp.at));
            }
            DonationStatus::Pending => {}
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Actor, Clock, FixedClock, WorkflowAction};
    use sea_orm::ActiveValue;

    #[test]
    fn donation_currency_defaults_to_euro() {
        let request: CreateDonationRequest =
            serde_json::from_str(r#"{"donor_name": "Ana", "amount": 25}"#).unwrap();
        assert_eq!(request.currency, "EUR");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn bond_validation_names_fields() {
        let request = CreateEnergyBondRequest {
            title: "  ".to_string(),
            description: None,
            provider_id: None,
            nominal_amount: Decimal::ZERO,
            interest_rate: Decimal::new(35, 1),
            term_months: 0,
        };
        let err = ServiceError::from(request.validate().unwrap_err());
        match err {
            ServiceError::ValidationFailed(fields) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("nominal_amount"));
                assert!(fields.contains_key("term_months"));
                assert!(!fields.contains_key("interest_rate"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejection_stamps_actor_and_reason() {
        let clock = FixedClock::at_rfc3339("2026-02-10T12:00:00Z").unwrap();
        let actor = Actor(Uuid::new_v4());
        let stamp = TransitionStamp::new(
            WorkflowAction::Reject,
            actor,
            &clock,
            Some("incomplete paperwork".to_string()),
        );
        let model = energy_bond::Model {
            id: Uuid::new_v4(),
            title: "Rooftop bond".to_string(),
            description: None,
            provider_id: None,
            nominal_amount: Decimal::new(1000, 0),
            interest_rate: Decimal::new(3, 0),
            term_months: 24,
            status: "pending".to_string(),
            version: 4,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: clock.now(),
            updated_at: clock.now(),
        };

        let active = EnergyBonds::transitioned(model, BondStatus::Rejected, &stamp);
        assert_eq!(active.status, ActiveValue::Set("rejected".to_string()));
        assert_eq!(active.version, ActiveValue::Set(5));
        assert_eq!(active.rejected_by, ActiveValue::Set(Some(actor.id())));
        assert_eq!(
            active.rejection_reason,
            ActiveValue::Set(Some("incomplete paperwork".to_string()))
        );
        assert!(active.approved_by.is_not_set());
    }
}
