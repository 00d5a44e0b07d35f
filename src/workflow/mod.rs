//! Guarded status transitions shared by every workflow record.
//!
//! A record type declares its states and a table of [`TransitionRule`]s. [`plan`] checks a
//! requested action against that table without touching storage; the caller then stamps
//! the record through a [`TransitionStamp`] built from an explicit [`Actor`] and [`Clock`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    StrumDisplay,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Approve,
    Reject,
    Confirm,
    Process,
    Refund,
    Start,
    Pause,
    Resume,
    Cancel,
    Complete,
}

impl WorkflowAction {
    pub fn past_participle(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Confirm => "confirmed",
            Self::Process => "processed",
            Self::Refund => "refunded",
            Self::Start => "started",
            Self::Pause => "paused",
            Self::Resume => "resumed",
            Self::Cancel => "cancelled",
            Self::Complete => "completed",
        }
    }

    /// Actions that must carry a reason in the request body.
    pub fn requires_reason(self) -> bool {
        matches!(self, Self::Reject | Self::Refund)
    }
}

/// `action` moves a record from any state in `from` to `to`.
#[derive(Debug)]
pub struct TransitionRule<S: 'static> {
    pub action: WorkflowAction,
    pub from: &'static [S],
    pub to: S,
}

/// Status enum of a workflow record.
pub trait WorkflowState:
    Copy + Eq + Debug + Display + FromStr + Send + Sync + 'static
{
    const RULES: &'static [TransitionRule<Self>];

    fn rule_for(action: WorkflowAction) -> Option<&'static TransitionRule<Self>> {
        Self::RULES.iter().find(|rule| rule.action == action)
    }

    fn supported_actions() -> Vec<WorkflowAction> {
        Self::RULES.iter().map(|rule| rule.action).collect()
    }

    /// Parses a stored status; an unknown value means the row was written outside the API.
    fn parse_stored(raw: &str) -> Result<Self, ServiceError> {
        raw.parse()
            .map_err(|_| ServiceError::InternalError(format!("unknown stored status '{}'", raw)))
    }
}

fn describe<S: Display>(states: &[S]) -> String {
    let names: Vec<String> = states
        .iter()
        .map(|s| s.to_string().replace('_', " "))
        .collect();
    names.join(" or ")
}

/// Resolves the target state for `action`, or explains why the record cannot take it.
/// `label` is the plural resource name used in messages, e.g. "energy bonds".
pub fn plan<S: WorkflowState>(
    current: S,
    action: WorkflowAction,
    label: &str,
) -> Result<S, ServiceError> {
    let rule = S::rule_for(action).ok_or_else(|| {
        ServiceError::NotFound(format!("{} do not support the '{}' action", label, action))
    })?;

    if rule.from.contains(&current) {
        Ok(rule.to)
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "only {} {} can be {}",
            describe(rule.from),
            label,
            action.past_participle()
        )))
    }
}

/// Identity performing a mutation, taken from the `x-actor-id` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor(pub Uuid);

impl Actor {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

/// Audit data applied to a record alongside its new status.
#[derive(Debug, Clone)]
pub struct TransitionStamp {
    pub action: WorkflowAction,
    pub actor: Uuid,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

impl TransitionStamp {
    pub fn new(action: WorkflowAction, actor: Actor, clock: &dyn Clock, note: Option<String>) -> Self {
        Self {
            action,
            actor: actor.id(),
            at: clock.now(),
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
    #[strum(serialize_all = "snake_case")]
    enum Ticket {
        Open,
        InReview,
        Closed,
    }

    impl WorkflowState for Ticket {
        const RULES: &'static [TransitionRule<Self>] = &[
            TransitionRule {
                action: WorkflowAction::Start,
                from: &[Ticket::Open],
                to: Ticket::InReview,
            },
            TransitionRule {
                action: WorkflowAction::Complete,
                from: &[Ticket::Open, Ticket::InReview],
                to: Ticket::Closed,
            },
        ];
    }

    #[rstest]
    #[case(Ticket::Open, WorkflowAction::Start, Ticket::InReview)]
    #[case(Ticket::Open, WorkflowAction::Complete, Ticket::Closed)]
    #[case(Ticket::InReview, WorkflowAction::Complete, Ticket::Closed)]
    fn allowed_transitions_resolve_target(
        #[case] current: Ticket,
        #[case] action: WorkflowAction,
        #[case] expected: Ticket,
    ) {
        assert_eq!(plan(current, action, "tickets").unwrap(), expected);
    }

    #[test]
    fn disallowed_source_names_the_allowed_states() {
        let err = plan(Ticket::Closed, WorkflowAction::Complete, "tickets").unwrap_err();
        match err {
            ServiceError::InvalidTransition(msg) => {
                assert_eq!(msg, "only open or in review tickets can be completed")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unsupported_action_is_not_found() {
        let err = plan(Ticket::Open, WorkflowAction::Refund, "tickets").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn actions_parse_from_path_segments() {
        assert_eq!("approve".parse::<WorkflowAction>().unwrap(), WorkflowAction::Approve);
        assert!("explode".parse::<WorkflowAction>().is_err());
        assert_eq!(WorkflowAction::Cancel.to_string(), "cancel");
    }

    #[test]
    fn stamp_uses_injected_clock() {
        let clock = FixedClock::at_rfc3339("2026-03-01T09:30:00Z").unwrap();
        let actor = Actor(Uuid::new_v4());
        let stamp = TransitionStamp::new(WorkflowAction::Approve, actor, &clock, None);
        assert_eq!(stamp.at, clock.now());
        assert_eq!(stamp.actor, actor.id());
    }

    mod resource_rules {
        use super::super::*;
        use crate::entities::carbon_credit::CreditStatus;
        use crate::entities::donation::DonationStatus;
        use crate::entities::energy_bond::BondStatus;
        use crate::entities::maintenance_task::TaskStatus;
        use crate::entities::subscription_request::RequestStatus;
        use crate::entities::user_subscription::SubscriptionStatus;
        use rstest::rstest;
        use crate::workflow::WorkflowAction::*;

        fn assert_invalid<S: WorkflowState>(current: S, action: WorkflowAction) {
            match plan(current, action, "records") {
                Err(ServiceError::InvalidTransition(_)) => {}
                other => panic!("{} from {} should be invalid, got {:?}", action, current, other),
            }
        }

        fn assert_unsupported<S: WorkflowState>(current: S, action: WorkflowAction) {
            match plan(current, action, "records") {
                Err(ServiceError::NotFound(_)) => {}
                other => panic!("{} should be unsupported, got {:?}", action, other),
            }
        }

        #[rstest]
        #[case(BondStatus::Pending, Approve, BondStatus::Approved)]
        #[case(BondStatus::Pending, Reject, BondStatus::Rejected)]
        #[case(BondStatus::Pending, Cancel, BondStatus::Cancelled)]
        #[case(BondStatus::Approved, Cancel, BondStatus::Cancelled)]
        fn bond_transitions(
            #[case] current: BondStatus,
            #[case] action: WorkflowAction,
            #[case] expected: BondStatus,
        ) {
            assert_eq!(plan(current, action, "energy bonds").unwrap(), expected);
        }

        #[rstest]
        #[case(BondStatus::Approved, Approve)]
        #[case(BondStatus::Approved, Reject)]
        #[case(BondStatus::Rejected, Cancel)]
        #[case(BondStatus::Cancelled, Approve)]
        fn bond_rejections(#[case] current: BondStatus, #[case] action: WorkflowAction) {
            assert_invalid(current, action);
        }

        #[rstest]
        #[case(CreditStatus::Pending, Approve, CreditStatus::Approved)]
        #[case(CreditStatus::Pending, Reject, CreditStatus::Rejected)]
        #[case(CreditStatus::Approved, Complete, CreditStatus::Retired)]
        fn credit_transitions(
            #[case] current: CreditStatus,
            #[case] action: WorkflowAction,
            #[case] expected: CreditStatus,
        ) {
            assert_eq!(plan(current, action, "carbon credits").unwrap(), expected);
        }

        #[rstest]
        #[case(CreditStatus::Pending, Complete)]
        #[case(CreditStatus::Retired, Complete)]
        #[case(CreditStatus::Rejected, Approve)]
        fn credit_rejections(#[case] current: CreditStatus, #[case] action: WorkflowAction) {
            assert_invalid(current, action);
        }

        #[rstest]
        #[case(DonationStatus::Pending, Confirm, DonationStatus::Confirmed)]
        #[case(DonationStatus::Confirmed, Process, DonationStatus::Processed)]
        #[case(DonationStatus::Confirmed, Refund, DonationStatus::Refunded)]
        #[case(DonationStatus::Processed, Refund, DonationStatus::Refunded)]
        #[case(DonationStatus::Pending, Cancel, DonationStatus::Cancelled)]
        fn donation_transitions(
            #[case] current: DonationStatus,
            #[case] action: WorkflowAction,
            #[case] expected: DonationStatus,
        ) {
            assert_eq!(plan(current, action, "donations").unwrap(), expected);
        }

        #[rstest]
        #[case(DonationStatus::Pending, Refund)]
        #[case(DonationStatus::Pending, Process)]
        #[case(DonationStatus::Confirmed, Cancel)]
        #[case(DonationStatus::Refunded, Refund)]
        fn donation_rejections(#[case] current: DonationStatus, #[case] action: WorkflowAction) {
            assert_invalid(current, action);
        }

        #[rstest]
        #[case(TaskStatus::Pending, Start, TaskStatus::InProgress)]
        #[case(TaskStatus::InProgress, Pause, TaskStatus::Paused)]
        #[case(TaskStatus::Paused, Resume, TaskStatus::InProgress)]
        #[case(TaskStatus::InProgress, Complete, TaskStatus::Completed)]
        #[case(TaskStatus::Pending, Cancel, TaskStatus::Cancelled)]
        #[case(TaskStatus::InProgress, Cancel, TaskStatus::Cancelled)]
        #[case(TaskStatus::Paused, Cancel, TaskStatus::Cancelled)]
        fn maintenance_transitions(
            #[case] current: TaskStatus,
            #[case] action: WorkflowAction,
            #[case] expected: TaskStatus,
        ) {
            assert_eq!(plan(current, action, "maintenance tasks").unwrap(), expected);
        }

        #[rstest]
        #[case(TaskStatus::Pending, Complete)]
        #[case(TaskStatus::Paused, Complete)]
        #[case(TaskStatus::Completed, Cancel)]
        #[case(TaskStatus::InProgress, Start)]
        fn maintenance_rejections(#[case] current: TaskStatus, #[case] action: WorkflowAction) {
            assert_invalid(current, action);
        }

        #[rstest]
        #[case(SubscriptionStatus::Active, Pause, SubscriptionStatus::Paused)]
        #[case(SubscriptionStatus::Paused, Resume, SubscriptionStatus::Active)]
        #[case(SubscriptionStatus::Active, Cancel, SubscriptionStatus::Cancelled)]
        #[case(SubscriptionStatus::Paused, Cancel, SubscriptionStatus::Cancelled)]
        fn user_subscription_transitions(
            #[case] current: SubscriptionStatus,
            #[case] action: WorkflowAction,
            #[case] expected: SubscriptionStatus,
        ) {
            assert_eq!(plan(current, action, "user subscriptions").unwrap(), expected);
        }

        #[rstest]
        #[case(SubscriptionStatus::Active, Resume)]
        #[case(SubscriptionStatus::Paused, Pause)]
        #[case(SubscriptionStatus::Cancelled, Resume)]
        #[case(SubscriptionStatus::Cancelled, Cancel)]
        fn user_subscription_rejections(
            #[case] current: SubscriptionStatus,
            #[case] action: WorkflowAction,
        ) {
            assert_invalid(current, action);
        }

        #[rstest]
        #[case(RequestStatus::Pending, Approve, RequestStatus::Approved)]
        #[case(RequestStatus::Pending, Reject, RequestStatus::Rejected)]
        #[case(RequestStatus::Approved, Process, RequestStatus::Processed)]
        fn subscription_request_transitions(
            #[case] current: RequestStatus,
            #[case] action: WorkflowAction,
            #[case] expected: RequestStatus,
        ) {
            assert_eq!(plan(current, action, "subscription requests").unwrap(), expected);
        }

        #[rstest]
        #[case(RequestStatus::Pending, Process)]
        #[case(RequestStatus::Approved, Reject)]
        #[case(RequestStatus::Processed, Approve)]
        fn subscription_request_rejections(
            #[case] current: RequestStatus,
            #[case] action: WorkflowAction,
        ) {
            assert_invalid(current, action);
        }

        #[test]
        fn actions_outside_each_table_are_unsupported() {
            assert_unsupported(BondStatus::Pending, Refund);
            assert_unsupported(CreditStatus::Pending, Cancel);
            assert_unsupported(DonationStatus::Pending, Approve);
            assert_unsupported(TaskStatus::Pending, Approve);
            assert_unsupported(SubscriptionStatus::Active, Complete);
            assert_unsupported(RequestStatus::Pending, Cancel);
        }

        #[test]
        fn every_action_appears_once_per_table() {
            fn distinct<S: WorkflowState>() -> bool {
                let actions = S::supported_actions();
                actions
                    .iter()
                    .enumerate()
                    .all(|(i, action)| !actions[i + 1..].contains(action))
            }
            assert!(distinct::<BondStatus>());
            assert!(distinct::<CreditStatus>());
            assert!(distinct::<DonationStatus>());
            assert!(distinct::<TaskStatus>());
            assert!(distinct::<SubscriptionStatus>());
            assert!(distinct::<RequestStatus>());
        }
    }
}
