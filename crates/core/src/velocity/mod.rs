//! Trailing-window sales velocity per (store, product).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::domain::inventory::{InventoryLevel, RawInventoryRow};
use crate::domain::movement::{MovementEvent, MovementKind, RawMovementRow};
use crate::domain::product::{ProductId, StoreId};
use crate::errors::EngineError;

/// Days until on-hand stock runs out at the current velocity.
///
/// `Unbounded` stands in for "never" when nothing is selling; it serializes
/// as the string `"unbounded"` so no infinity reaches a renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StockoutHorizon {
    Days(f64),
    Unbounded,
}

impl StockoutHorizon {
    pub fn from_velocity(on_hand: u64, units_per_day: f64) -> Self {
        if units_per_day > 0.0 {
            Self::Days(on_hand as f64 / units_per_day)
        } else {
            Self::Unbounded
        }
    }

    pub fn days(&self) -> Option<f64> {
        match self {
            Self::Days(days) => Some(*days),
            Self::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// The sooner of two horizons; any finite value beats `Unbounded`.
    pub fn sooner(self, other: Self) -> Self {
        match (self, other) {
            (Self::Days(left), Self::Days(right)) => Self::Days(left.min(right)),
            (Self::Days(days), Self::Unbounded) | (Self::Unbounded, Self::Days(days)) => {
                Self::Days(days)
            }
            (Self::Unbounded, Self::Unbounded) => Self::Unbounded,
        }
    }
}

impl Serialize for StockoutHorizon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Days(days) => serializer.serialize_f64(*days),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

impl<'de> Deserialize<'de> for StockoutHorizon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HorizonVisitor;

        impl Visitor<'_> for HorizonVisitor {
            type Value = StockoutHorizon;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a non-negative number of days or \"unbounded\"")
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                if value.is_finite() && value >= 0.0 {
                    Ok(StockoutHorizon::Days(value))
                } else {
                    Err(E::custom("days until stockout must be finite and non-negative"))
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(StockoutHorizon::Days(value as f64))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                self.visit_f64(value as f64)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                if value == "unbounded" {
                    Ok(StockoutHorizon::Unbounded)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_any(HorizonVisitor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityRecord {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub units_per_day: f64,
    pub window_days: u32,
    pub on_hand: u64,
    pub days_until_stockout: StockoutHorizon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityEstimate {
    /// Ordered by `(store_id, product_id)`.
    pub records: Vec<VelocityRecord>,
    /// Movement and inventory rows dropped as malformed.
    pub skipped_count: usize,
    /// First date counted in the window.
    pub window_start: NaiveDate,
    pub as_of: NaiveDate,
}

#[derive(Default)]
struct PairTotals {
    sold: u64,
    returned: u64,
    sold_in_window: bool,
    on_hand: Option<u64>,
}

/// Stateless velocity estimator.
#[derive(Clone, Copy, Debug, Default)]
pub struct VelocityEstimator;

impl VelocityEstimator {
    /// Units per day over the `window_days` calendar days ending on `as_of`
    /// (inclusive), joined with the inventory snapshot.
    ///
    /// Returns net of returns, floored at zero. Restocks and adjustments do
    /// not move velocity. Pairs that sold but are absent from the snapshot
    /// are reported with `on_hand = 0`; pairs that only saw returns need a
    /// snapshot row to be reported. Duplicate snapshot rows for a pair are
    /// summed.
    pub fn estimate(
        &self,
        events: &[RawMovementRow],
        inventory: &[RawInventoryRow],
        window_days: u32,
        as_of: NaiveDate,
    ) -> Result<VelocityEstimate, EngineError> {
        if window_days == 0 {
            return Err(EngineError::InvalidWindow { window_days });
        }

        let window_start = as_of - Duration::days(i64::from(window_days) - 1);
        let mut pairs: BTreeMap<(StoreId, ProductId), PairTotals> = BTreeMap::new();
        let mut skipped_count = 0;

        for row in events {
            let event = match MovementEvent::from_raw(row) {
                Ok(event) => event,
                Err(reason) => {
                    skipped_count += 1;
                    debug!(
                        event_name = "engine.velocity.row_skipped",
                        source = "movement",
                        reason = reason.as_str(),
                        "movement row dropped"
                    );
                    continue;
                }
            };

            let date = event.occurred_at.date();
            if date < window_start || date > as_of {
                continue;
            }

            let totals = pairs.entry((event.store_id, event.product_id)).or_default();
            match event.kind {
                MovementKind::Sale => {
                    totals.sold = totals.sold.saturating_add(event.quantity);
                    totals.sold_in_window = true;
                }
                MovementKind::Return => {
                    totals.returned = totals.returned.saturating_add(event.quantity);
                }
                MovementKind::Restock | MovementKind::Adjustment => {}
            }
        }

        for row in inventory {
            let level = match InventoryLevel::from_raw(row) {
                Ok(level) => level,
                Err(reason) => {
                    skipped_count += 1;
                    debug!(
                        event_name = "engine.velocity.row_skipped",
                        source = "inventory",
                        reason = reason.as_str(),
                        "inventory row dropped"
                    );
                    continue;
                }
            };

            let totals = pairs.entry((level.store_id, level.product_id)).or_default();
            totals.on_hand = Some(totals.on_hand.unwrap_or(0).saturating_add(level.on_hand));
        }

        let records: Vec<VelocityRecord> = pairs
            .into_iter()
            .filter(|(_, totals)| totals.sold_in_window || totals.on_hand.is_some())
            .map(|((store_id, product_id), totals)| {
                let units = totals.sold.saturating_sub(totals.returned);
                let units_per_day = units as f64 / f64::from(window_days);
                let on_hand = totals.on_hand.unwrap_or(0);
                VelocityRecord {
                    store_id,
                    product_id,
                    units_per_day,
                    window_days,
                    on_hand,
                    days_until_stockout: StockoutHorizon::from_velocity(on_hand, units_per_day),
                }
            })
            .collect();

        debug!(
            event_name = "engine.velocity.estimated",
            records = records.len(),
            skipped_count,
            window_days,
            as_of = %as_of,
            "sales velocity estimated"
        );

        Ok(VelocityEstimate { records, skipped_count, window_start, as_of })
    }
}
