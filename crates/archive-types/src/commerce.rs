//! Raw commerce platform records.
//!
//! The platform reports draft-order state through loosely typed strings
//! (`"invoice_sent"`, `"INVOICE_SENT"`, comma-joined tag lists, fulfillment
//! strings that differ between REST and GraphQL). Everything here is parsed
//! into strict enums exactly once, when a record crosses into the workspace,
//! so that nothing deeper in the call stack re-derives meaning from strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Monetary amount with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
	pub amount: Decimal,
	pub currency_code: String,
}

impl Money {
	pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
		Self {
			amount,
			currency_code: currency_code.into(),
		}
	}

	/// Zero in the given currency.
	pub fn zero(currency_code: impl Into<String>) -> Self {
		Self::new(Decimal::ZERO, currency_code)
	}

	/// Parses a platform money string such as `"12.50"`.
	///
	/// Malformed amounts are treated as zero; the platform only ever reports
	/// prices it has accepted, so a parse failure means a missing price.
	pub fn parse(amount: &str, currency_code: impl Into<String>) -> Self {
		let amount = Decimal::from_str(amount.trim()).unwrap_or(Decimal::ZERO);
		Self::new(amount, currency_code)
	}

	pub fn is_positive(&self) -> bool {
		self.amount > Decimal::ZERO
	}
}

impl fmt::Display for Money {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "${:.2}", self.amount)
	}
}

/// Sub-status of a draft order on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftOrderStatus {
	/// Editable, no invoice sent yet.
	Open,
	/// A priced invoice has been sent to the customer.
	InvoiceSent,
	/// Paid and converted into a real order.
	Completed,
}

impl DraftOrderStatus {
	/// Parses either the REST (`invoice_sent`) or GraphQL (`INVOICE_SENT`)
	/// spelling. Unknown values map to `Open`.
	pub fn from_wire(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"invoice_sent" => Self::InvoiceSent,
			"completed" => Self::Completed,
			_ => Self::Open,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Open => "open",
			Self::InvoiceSent => "invoice_sent",
			Self::Completed => "completed",
		}
	}
}

impl fmt::Display for DraftOrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for DraftOrderStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for DraftOrderStatus {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Ok(Self::from_wire(&raw))
	}
}

/// Fulfillment state of a finalised order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FulfillmentStatus {
	#[default]
	Unfulfilled,
	Partial,
	Fulfilled,
	Restocked,
	/// Anything the platform reports that has no meaning here
	/// (`ON_HOLD`, `SCHEDULED`, ...).
	Other,
}

impl FulfillmentStatus {
	/// Parses the REST `fulfillment_status` or the GraphQL
	/// `displayFulfillmentStatus`. `None` means nothing has shipped.
	pub fn from_wire(value: Option<&str>) -> Self {
		let Some(value) = value else {
			return Self::Unfulfilled;
		};
		match value.trim().to_ascii_lowercase().as_str() {
			"" | "null" | "unfulfilled" => Self::Unfulfilled,
			"partial" | "partially_fulfilled" => Self::Partial,
			"fulfilled" => Self::Fulfilled,
			"restocked" => Self::Restocked,
			_ => Self::Other,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Unfulfilled => "unfulfilled",
			Self::Partial => "partial",
			Self::Fulfilled => "fulfilled",
			Self::Restocked => "restocked",
			Self::Other => "other",
		}
	}
}

impl Serialize for FulfillmentStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for FulfillmentStatus {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = Option::<String>::deserialize(deserializer)?;
		Ok(Self::from_wire(raw.as_deref()))
	}
}

/// Normalised set of tags.
///
/// Tags are trimmed and lower-cased on the way in, keeping first-seen order
/// and dropping duplicates. On the wire the platform uses a comma-joined
/// string for REST and an array for GraphQL; both deserialize here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a comma-joined tag list.
	pub fn parse(raw: &str) -> Self {
		raw.split(',').collect()
	}

	pub fn single(tag: &str) -> Self {
		std::iter::once(tag).collect()
	}

	pub fn contains(&self, tag: &str) -> bool {
		let needle = tag.trim().to_lowercase();
		self.0.iter().any(|t| *t == needle)
	}

	pub fn insert(&mut self, tag: &str) {
		let tag = tag.trim().to_lowercase();
		if !tag.is_empty() && !self.0.contains(&tag) {
			self.0.push(tag);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

impl<'a> FromIterator<&'a str> for TagSet {
	fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
		let mut set = TagSet::new();
		for tag in iter {
			set.insert(tag);
		}
		set
	}
}

impl fmt::Display for TagSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.join(", "))
	}
}

impl Serialize for TagSet {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for TagSet {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Wire {
			Joined(String),
			List(Vec<String>),
			Missing(()),
		}

		Ok(match Wire::deserialize(deserializer)? {
			Wire::Joined(raw) => TagSet::parse(&raw),
			Wire::List(tags) => tags.iter().map(String::as_str).collect(),
			Wire::Missing(()) => TagSet::new(),
		})
	}
}

/// Name/value custom attribute attached to a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemProperty {
	pub name: String,
	pub value: String,
}

impl LineItemProperty {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// Line item of a draft order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	pub title: String,
	pub price: Decimal,
	pub quantity: u32,
	#[serde(default)]
	pub requires_shipping: bool,
	#[serde(default)]
	pub properties: Vec<LineItemProperty>,
}

impl LineItem {
	/// Returns the value of a custom property, treating empty values as absent.
	pub fn property(&self, name: &str) -> Option<&str> {
		self.properties
			.iter()
			.find(|p| p.name == name)
			.map(|p| p.value.as_str())
			.filter(|v| !v.is_empty())
	}
}

/// Customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
	pub id: u64,
	pub email: String,
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub last_name: String,
}

/// Payload for creating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub verified_email: bool,
	pub send_email_welcome: bool,
}

impl NewCustomer {
	/// A verified customer that does not receive the platform welcome email.
	pub fn verified(
		email: impl Into<String>,
		first_name: Option<&str>,
		last_name: Option<&str>,
	) -> Self {
		Self {
			email: email.into(),
			first_name: first_name.unwrap_or_default().to_string(),
			last_name: last_name.unwrap_or_default().to_string(),
			verified_email: true,
			send_email_welcome: false,
		}
	}
}

/// The finalised order a completed draft turned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedOrder {
	pub id: u64,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub fulfillment: FulfillmentStatus,
	#[serde(default)]
	pub cancelled: bool,
}

/// Draft order record, normalised from either REST or GraphQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
	pub id: u64,
	pub name: String,
	pub status: DraftOrderStatus,
	pub created_at: DateTime<Utc>,
	pub invoice_url: Option<String>,
	pub total_price: Money,
	pub note: Option<String>,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub line_items: Vec<LineItem>,
	pub customer: Option<Customer>,
	pub email: Option<String>,
	pub linked_order: Option<LinkedOrder>,
}

impl DraftOrder {
	/// The email that owns this draft: the customer's, else the draft's own.
	pub fn owner_email(&self) -> Option<&str> {
		self.customer
			.as_ref()
			.map(|c| c.email.as_str())
			.filter(|e| !e.is_empty())
			.or(self.email.as_deref())
			.filter(|e| !e.is_empty())
	}
}

/// Payload for creating a draft order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftOrderInput {
	pub line_items: Vec<LineItem>,
	/// Attach to this customer when known...
	pub customer_id: Option<u64>,
	/// ...otherwise key the draft by email alone.
	pub email: Option<String>,
	pub tags: TagSet,
	pub note: String,
}

/// Partial update of a draft order. `None` fields are left untouched.
///
/// The update carries no version token: the platform applies it
/// unconditionally, so the last writer's line items win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftOrderUpdate {
	pub line_items: Option<Vec<LineItem>>,
	pub note: Option<String>,
}

/// Search over draft orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOrderQuery {
	pub tag: String,
	pub status: Option<DraftOrderStatus>,
	pub limit: u32,
	/// Line items fetched per draft.
	pub line_items_limit: u32,
	/// Newest first.
	pub reverse: bool,
}

impl DraftOrderQuery {
	/// Renders the platform search syntax, e.g. `tag:x status:open`.
	pub fn search_string(&self) -> String {
		match self.status {
			Some(status) => format!("tag:{} status:{}", self.tag, status),
			None => format!("tag:{}", self.tag),
		}
	}
}

/// Fulfillment tracking details of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
	pub tracking_company: Option<String>,
	pub tracking_number: Option<String>,
	pub tracking_url: Option<String>,
}

/// Shipping address of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
	pub first_name: String,
	pub last_name: String,
	pub address1: String,
	pub address2: Option<String>,
	pub city: String,
	pub province: String,
	pub zip: String,
	pub country: String,
}

/// Line item of a finalised order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
	pub title: String,
	pub quantity: u32,
	pub price: Decimal,
	pub variant_title: Option<String>,
	#[serde(default)]
	pub properties: Vec<LineItemProperty>,
}

impl OrderLineItem {
	pub fn property(&self, name: &str) -> Option<&str> {
		self.properties
			.iter()
			.find(|p| p.name == name)
			.map(|p| p.value.as_str())
			.filter(|v| !v.is_empty())
	}
}

/// Finalised order as reported by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOrder {
	pub id: u64,
	pub name: String,
	pub created_at: DateTime<Utc>,
	pub financial_status: String,
	pub fulfillment: FulfillmentStatus,
	pub total_price: Money,
	pub line_items: Vec<OrderLineItem>,
	pub shipping_address: Option<ShippingAddress>,
	#[serde(default)]
	pub fulfillments: Vec<Fulfillment>,
}
