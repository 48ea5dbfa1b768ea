//! Model types for the order and shipment tables.

use serde::{Deserialize, Serialize};

/// Order delivery status stored in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Not yet picked up by the shipment batch.
    Unshipped,
    /// Picked up and recorded in the shipment table.
    Shipped,
}

impl OrderStatus {
    /// Single-character flag as stored in the database (`N` / `Y`).
    pub fn as_flag(&self) -> &'static str {
        match self {
            OrderStatus::Unshipped => "N",
            OrderStatus::Shipped => "Y",
        }
    }

    /// Parse the stored flag. Unknown values map to `Unshipped` so a bad
    /// row is retried by the batch rather than silently skipped.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "Y" => OrderStatus::Shipped,
            _ => OrderStatus::Unshipped,
        }
    }
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Allocated identifier (`A000`..`Z999`), unique per applicant key.
    pub order_id: String,
    pub user_id: String,
    pub item_id: String,
    pub applicant_key: String,
    pub name: String,
    pub address: String,
    pub item_name: String,
    /// Opaque price string, passed through to the receipt verbatim.
    pub price: String,
    pub status: OrderStatus,
}

/// A normalized order row arriving from intake, before id allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub item_id: String,
    pub name: String,
    pub address: String,
    pub item_name: String,
    pub price: String,
}

impl NewOrder {
    /// Bind an allocated identifier and applicant key, producing the row
    /// to insert. New rows always start unshipped.
    pub fn into_order(self, order_id: String, applicant_key: &str) -> Order {
        Order {
            order_id,
            user_id: self.user_id,
            item_id: self.item_id,
            applicant_key: applicant_key.to_string(),
            name: self.name,
            address: self.address,
            item_name: self.item_name,
            price: self.price,
            status: OrderStatus::Unshipped,
        }
    }
}

/// A shipment row produced by the shipment batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    /// Reuses the order identifier.
    pub shipment_id: String,
    pub order_id: String,
    pub item_id: String,
    pub applicant_key: String,
    pub address: String,
}

impl Shipment {
    /// Build the shipment row for an order.
    pub fn from_order(order: &Order) -> Self {
        Self {
            shipment_id: order.order_id.clone(),
            order_id: order.order_id.clone(),
            item_id: order.item_id.clone(),
            applicant_key: order.applicant_key.clone(),
            address: order.address.clone(),
        }
    }
}
