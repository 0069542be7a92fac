use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, StoreId};
use crate::domain::{required_identifier, RejectReason};

/// One row of the current-inventory snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInventoryRow {
    pub store_id: Option<String>,
    pub product_id: Option<String>,
    pub on_hand: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub on_hand: u64,
}

impl InventoryLevel {
    pub fn from_raw(row: &RawInventoryRow) -> Result<Self, RejectReason> {
        let store_id = StoreId(required_identifier(row.store_id.as_deref(), "store_id")?);
        let product_id = ProductId(required_identifier(row.product_id.as_deref(), "product_id")?);
        let on_hand = row.on_hand.ok_or(RejectReason::MissingQuantity)?;
        let on_hand = u64::try_from(on_hand).map_err(|_| RejectReason::NegativeQuantity)?;

        Ok(Self { store_id, product_id, on_hand })
    }
}
