use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, SupplierId};
use crate::domain::{parse_local_timestamp, RejectReason};

/// An order line item as exported by the persistence layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSaleRow {
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    pub supplier_id: Option<String>,
    pub timestamp: Option<String>,
    pub quantity: Option<i64>,
    pub amount: Option<Decimal>,
}

/// A validated line item. `amount` is the line's monetary total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub order_id: Option<String>,
    pub product_id: Option<ProductId>,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: NaiveDateTime,
    pub quantity: u64,
    pub amount: Decimal,
}

impl SaleRecord {
    pub fn from_raw(row: &RawSaleRow) -> Result<Self, RejectReason> {
        let occurred_at = match row.timestamp.as_deref() {
            Some(raw) => parse_local_timestamp(raw)?,
            None => return Err(RejectReason::MissingTimestamp),
        };

        let quantity = row.quantity.ok_or(RejectReason::MissingQuantity)?;
        let quantity = u64::try_from(quantity).map_err(|_| RejectReason::NegativeQuantity)?;

        let amount = row.amount.ok_or(RejectReason::MissingAmount)?;
        if amount < Decimal::ZERO {
            return Err(RejectReason::NegativeAmount);
        }

        Ok(Self {
            order_id: non_blank(row.order_id.as_deref()),
            product_id: non_blank(row.product_id.as_deref()).map(ProductId),
            supplier_id: non_blank(row.supplier_id.as_deref()).map(SupplierId),
            occurred_at,
            quantity,
            amount,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
