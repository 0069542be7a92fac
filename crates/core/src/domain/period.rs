use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::{required_identifier, RejectReason};

/// One product's totals for a period, as exported by the persistence layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPeriodTotalsRow {
    pub product_id: Option<String>,
    pub total_units: Option<i64>,
    pub total_revenue: Option<Decimal>,
}

/// Aggregate sales of one product over one period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub product_id: ProductId,
    pub total_units: u64,
    pub total_revenue: Decimal,
}

impl PeriodTotals {
    pub fn from_raw(row: &RawPeriodTotalsRow) -> Result<Self, RejectReason> {
        let product_id = ProductId(required_identifier(row.product_id.as_deref(), "product_id")?);

        let total_units = row.total_units.ok_or(RejectReason::MissingQuantity)?;
        let total_units = u64::try_from(total_units).map_err(|_| RejectReason::NegativeQuantity)?;

        let total_revenue = row.total_revenue.ok_or(RejectReason::MissingAmount)?;
        if total_revenue < Decimal::ZERO {
            return Err(RejectReason::NegativeAmount);
        }

        Ok(Self { product_id, total_units, total_revenue })
    }
}
