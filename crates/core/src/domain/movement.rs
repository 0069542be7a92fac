use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, StoreId};
use crate::domain::{parse_local_timestamp, required_identifier, RejectReason};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Sale,
    Return,
    Restock,
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Return => "return",
            Self::Restock => "restock",
            Self::Adjustment => "adjustment",
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = RejectReason;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "return" => Ok(Self::Return),
            "restock" => Ok(Self::Restock),
            "adjustment" => Ok(Self::Adjustment),
            _ => Err(RejectReason::UnknownMovementKind),
        }
    }
}

/// A store-level inventory movement row. `kind` defaults to `sale` when the
/// exporting query only selects sales.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMovementRow {
    pub store_id: Option<String>,
    pub product_id: Option<String>,
    pub occurred_at: Option<String>,
    pub quantity: Option<i64>,
    pub kind: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEvent {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub occurred_at: NaiveDateTime,
    pub quantity: u64,
    pub kind: MovementKind,
}

impl MovementEvent {
    pub fn from_raw(row: &RawMovementRow) -> Result<Self, RejectReason> {
        let store_id = StoreId(required_identifier(row.store_id.as_deref(), "store_id")?);
        let product_id = ProductId(required_identifier(row.product_id.as_deref(), "product_id")?);

        let occurred_at = match row.occurred_at.as_deref() {
            Some(raw) => parse_local_timestamp(raw)?,
            None => return Err(RejectReason::MissingTimestamp),
        };

        let quantity = row.quantity.ok_or(RejectReason::MissingQuantity)?;
        let quantity = u64::try_from(quantity).map_err(|_| RejectReason::NegativeQuantity)?;

        let kind = match row.kind.as_deref() {
            Some(raw) => raw.parse::<MovementKind>()?,
            None => MovementKind::Sale,
        };

        Ok(Self { store_id, product_id, occurred_at, quantity, kind })
    }
}
