//! Customer order history types.

use crate::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery status of a finalised order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	Processing,
	Shipped,
	OutForDelivery,
	Delivered,
	Cancelled,
}

impl OrderStatus {
	pub fn step(&self) -> u8 {
		match self {
			Self::Cancelled => 1,
			Self::Processing => 2,
			Self::Shipped => 3,
			Self::OutForDelivery => 4,
			Self::Delivered => 5,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Processing => "Processing",
			Self::Shipped => "Shipped",
			Self::OutForDelivery => "Out for Delivery",
			Self::Delivered => "Delivered",
			Self::Cancelled => "Cancelled",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemSummary {
	pub title: String,
	pub variant: String,
	pub price: Money,
	pub quantity: u32,
	pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
	pub name: String,
	pub line1: String,
	pub city: String,
	pub state: String,
	pub postcode: String,
	pub country: String,
}

/// An order in the customer's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderSummary {
	/// Human-readable order name, e.g. `#1042`.
	pub id: String,
	pub placed_at: DateTime<Utc>,
	pub status: OrderStatus,
	pub total: Money,
	pub item_count: u32,
	pub tracking_number: Option<String>,
	pub carrier: Option<String>,
	pub items: Vec<OrderItemSummary>,
	pub shipping_address: Option<AddressSummary>,
	pub current_step: u8,
}
