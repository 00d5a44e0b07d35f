//! Capacity arithmetic for an energy zone.
//!
//! Everything here is pure: the reservation service loads a row, asks the ledger for the
//! next figures and persists them. `available_kwh_day`, the percentages and the status are
//! always derived from production and reserved capacity, never taken from input.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::config::AppConfig;
use crate::entities::energy_zone_summary::ZoneStatus;
use crate::errors::{CapacityShortage, FieldErrors, ServiceError};

/// kWh figures are kept to watt-hour precision.
pub const KWH_SCALE: u32 = 3;
/// Largest kWh figure a `decimal(14,3)` column holds.
pub const MAX_KWH: Decimal = dec!(99_999_999_999.999);
const PERCENT_SCALE: u32 = 2;
const HUNDRED: Decimal = dec!(100);

pub fn normalize_kwh(value: Decimal) -> Decimal {
    value.round_dp(KWH_SCALE).normalize()
}

/// Utilization cutoffs in percent: below `amber` is green, up to and including `red` is
/// amber, above `red` is red.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    amber: Decimal,
    red: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            amber: dec!(70),
            red: dec!(90),
        }
    }
}

impl Thresholds {
    pub fn new(amber: Decimal, red: Decimal) -> Result<Self, ServiceError> {
        if amber < Decimal::ZERO || red > HUNDRED || amber > red {
            return Err(ServiceError::ValidationError(format!(
                "zone thresholds must satisfy 0 <= amber ({}) <= red ({}) <= 100",
                amber, red
            )));
        }
        Ok(Self { amber, red })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let amber = Decimal::try_from(config.zone_amber_threshold)
            .map_err(|e| ServiceError::ValidationError(format!("zone_amber_threshold: {}", e)))?;
        let red = Decimal::try_from(config.zone_red_threshold)
            .map_err(|e| ServiceError::ValidationError(format!("zone_red_threshold: {}", e)))?;
        Self::new(amber, red)
    }

    pub fn amber(&self) -> Decimal {
        self.amber
    }

    pub fn red(&self) -> Decimal {
        self.red
    }

    /// Zero production is red: nothing can be reserved against it.
    pub fn classify(&self, production: Decimal, utilization: Decimal) -> ZoneStatus {
        if production <= Decimal::ZERO || utilization > self.red {
            ZoneStatus::Red
        } else if utilization >= self.amber {
            ZoneStatus::Amber
        } else {
            ZoneStatus::Green
        }
    }
}

/// Stored inputs of a zone's capacity accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ledger {
    pub production: Decimal,
    pub reserved: Decimal,
    pub requested: Decimal,
}

/// Values derived from a [`Ledger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerFigures {
    pub available_kwh_day: Decimal,
    pub utilization_percentage: Decimal,
    pub demand_percentage: Decimal,
    pub status: ZoneStatus,
}

/// `part / whole * 100`, 0 for an empty whole. Saturates at `Decimal::MAX` instead of
/// overflowing, which classifies as red.
fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::MAX)
}

impl Ledger {
    pub fn new(production: Decimal, reserved: Decimal, requested: Decimal) -> Self {
        Self {
            production: normalize_kwh(production),
            reserved: normalize_kwh(reserved),
            requested: normalize_kwh(requested),
        }
    }

    pub fn available(&self) -> Decimal {
        (self.production - self.reserved).max(Decimal::ZERO)
    }

    pub fn utilization_percentage(&self) -> Decimal {
        percentage_of(self.reserved, self.production)
            .round_dp(PERCENT_SCALE)
            .normalize()
    }

    pub fn demand_percentage(&self) -> Decimal {
        percentage_of(self.requested, self.production)
            .round_dp(PERCENT_SCALE)
            .normalize()
    }

    /// Derives availability, percentages and status. Idempotent.
    pub fn recompute(&self, thresholds: &Thresholds) -> LedgerFigures {
        let utilization = percentage_of(self.reserved, self.production);
        LedgerFigures {
            available_kwh_day: self.available(),
            utilization_percentage: self.utilization_percentage(),
            demand_percentage: self.demand_percentage(),
            status: thresholds.classify(self.production, utilization),
        }
    }

    /// Field-level check applied to administrative create/update.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let mut fields = FieldErrors::new();
        let mut reject = |field: &str, message: String| {
            fields.entry(field.to_string()).or_default().push(message);
        };

        if self.production < Decimal::ZERO {
            reject(
                "estimated_production_kwh_day",
                "The estimated production must be at least 0.".to_string(),
            );
        }
        if self.reserved < Decimal::ZERO {
            reject(
                "reserved_kwh_day",
                "The reserved capacity must be at least 0.".to_string(),
            );
        }
        if self.requested < Decimal::ZERO {
            reject(
                "requested_kwh_day",
                "The requested capacity must be at least 0.".to_string(),
            );
        }
        for (field, value) in [
            ("estimated_production_kwh_day", self.production),
            ("reserved_kwh_day", self.reserved),
            ("requested_kwh_day", self.requested),
        ] {
            if value > MAX_KWH {
                reject(field, format!("The value may not be greater than {}.", MAX_KWH));
            }
        }
        if self.reserved > self.production {
            reject(
                "reserved_kwh_day",
                format!(
                    "The reserved capacity ({}) cannot exceed the estimated production ({}).",
                    self.reserved, self.production
                ),
            );
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(fields))
        }
    }

    /// Commits `kwh` more capacity. All-or-nothing: on shortage `self` is untouched.
    pub fn reserve(&self, kwh: Decimal) -> Result<Ledger, ServiceError> {
        let kwh = positive_kwh(kwh)?;
        let available = self.available();
        if kwh > available {
            return Err(ServiceError::CapacityShortage(CapacityShortage {
                requested: kwh,
                available,
                shortfall: kwh - available,
            }));
        }
        Ok(Ledger {
            reserved: normalize_kwh(self.reserved + kwh),
            ..*self
        })
    }

    /// Returns `kwh` of committed capacity to the pool.
    pub fn release(&self, kwh: Decimal) -> Result<Ledger, ServiceError> {
        let kwh = positive_kwh(kwh)?;
        if kwh > self.reserved {
            return Err(ServiceError::field(
                "kwh",
                format!(
                    "Cannot release {} kWh: only {} kWh is currently reserved.",
                    kwh, self.reserved
                ),
            ));
        }
        Ok(Ledger {
            reserved: normalize_kwh(self.reserved - kwh),
            ..*self
        })
    }
}

fn positive_kwh(kwh: Decimal) -> Result<Decimal, ServiceError> {
    let kwh = normalize_kwh(kwh);
    if kwh <= Decimal::ZERO {
        return Err(ServiceError::field("kwh", "The kwh must be greater than 0."));
    }
    if kwh > MAX_KWH {
        return Err(ServiceError::field(
            "kwh",
            format!("The kwh may not be greater than {}.", MAX_KWH),
        ));
    }
    Ok(kwh)
}
