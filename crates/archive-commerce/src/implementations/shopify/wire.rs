//! Admin API wire formats.
//!
//! REST and GraphQL describe the same draft order differently: REST uses
//! numeric ids, comma-joined tags and lower-case statuses; GraphQL uses
//! string `legacyResourceId`s, tag arrays, upper-case statuses and nests the
//! linked order. Both are converted into [`DraftOrder`] here and nowhere else.

use crate::CommerceError;
use archive_types::{
	AdminOrder, Customer, DraftOrder, DraftOrderInput, DraftOrderStatus, DraftOrderUpdate,
	Fulfillment, FulfillmentStatus, LineItem, LineItemProperty, LinkedOrder, Money,
	OrderLineItem, ShippingAddress, TagSet,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Currency assumed when the platform omits one.
pub(crate) const DEFAULT_CURRENCY: &str = "AUD";

fn parse_price(raw: &str) -> Decimal {
	Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO)
}

fn parse_legacy_id(raw: &str) -> Result<u64, CommerceError> {
	raw.parse()
		.map_err(|_| CommerceError::Serialization(format!("invalid legacyResourceId '{}'", raw)))
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RestCustomer {
	pub id: u64,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
}

impl From<RestCustomer> for Customer {
	fn from(c: RestCustomer) -> Self {
		Customer {
			id: c.id,
			email: c.email.unwrap_or_default(),
			first_name: c.first_name.unwrap_or_default(),
			last_name: c.last_name.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerEnvelope {
	pub customer: RestCustomer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerSearchEnvelope {
	#[serde(default)]
	pub customers: Vec<RestCustomer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestProperty {
	pub name: String,
	#[serde(default)]
	pub value: Option<serde_json::Value>,
}

impl From<RestProperty> for LineItemProperty {
	fn from(p: RestProperty) -> Self {
		let value = match p.value {
			Some(serde_json::Value::String(s)) => s,
			Some(serde_json::Value::Null) | None => String::new(),
			Some(other) => other.to_string(),
		};
		LineItemProperty::new(p.name, value)
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestLineItem {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub price: Option<String>,
	#[serde(default = "one")]
	pub quantity: u32,
	#[serde(default)]
	pub requires_shipping: Option<bool>,
	#[serde(default)]
	pub properties: Option<Vec<RestProperty>>,
}

fn one() -> u32 {
	1
}

impl From<RestLineItem> for LineItem {
	fn from(li: RestLineItem) -> Self {
		LineItem {
			title: li.title,
			price: li.price.as_deref().map(parse_price).unwrap_or_default(),
			quantity: li.quantity,
			requires_shipping: li.requires_shipping.unwrap_or(false),
			properties: li
				.properties
				.unwrap_or_default()
				.into_iter()
				.map(Into::into)
				.collect(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestDraftOrder {
	pub id: u64,
	pub name: String,
	pub status: DraftOrderStatus,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub invoice_url: Option<String>,
	#[serde(default)]
	pub total_price: Option<String>,
	#[serde(default)]
	pub currency: Option<String>,
	#[serde(default)]
	pub note: Option<String>,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub line_items: Vec<RestLineItem>,
	#[serde(default)]
	pub customer: Option<RestCustomer>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub order_id: Option<u64>,
}

impl RestDraftOrder {
	/// Converts into a [`DraftOrder`], attaching the linked order fetched
	/// separately (REST only reports its id).
	pub fn into_draft(self, linked_order: Option<LinkedOrder>) -> DraftOrder {
		let currency = self
			.currency
			.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
		DraftOrder {
			id: self.id,
			name: self.name,
			status: self.status,
			created_at: self.created_at,
			invoice_url: non_empty(self.invoice_url),
			total_price: Money::parse(self.total_price.as_deref().unwrap_or("0.00"), currency),
			note: non_empty(self.note),
			tags: self.tags,
			line_items: self.line_items.into_iter().map(Into::into).collect(),
			customer: self.customer.map(Into::into),
			email: non_empty(self.email),
			linked_order,
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct DraftOrderEnvelope {
	pub draft_order: RestDraftOrder,
}

/// Slim order record used to complete a draft's linked order.
#[derive(Debug, Deserialize)]
pub(crate) struct RestOrderStatus {
	pub id: u64,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub fulfillment_status: Option<String>,
	#[serde(default)]
	pub cancelled_at: Option<String>,
}

impl From<RestOrderStatus> for LinkedOrder {
	fn from(o: RestOrderStatus) -> Self {
		LinkedOrder {
			id: o.id,
			tags: o.tags,
			fulfillment: FulfillmentStatus::from_wire(o.fulfillment_status.as_deref()),
			cancelled: o.cancelled_at.is_some_and(|at| !at.is_empty()),
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderStatusEnvelope {
	pub order: RestOrderStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestOrderLineItem {
	#[serde(default)]
	pub title: String,
	#[serde(default = "one")]
	pub quantity: u32,
	#[serde(default)]
	pub price: Option<String>,
	#[serde(default)]
	pub variant_title: Option<String>,
	#[serde(default)]
	pub properties: Option<Vec<RestProperty>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestAddress {
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub address1: Option<String>,
	#[serde(default)]
	pub address2: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub province: Option<String>,
	#[serde(default)]
	pub zip: Option<String>,
	#[serde(default)]
	pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestFulfillment {
	#[serde(default)]
	pub tracking_company: Option<String>,
	#[serde(default)]
	pub tracking_number: Option<String>,
	#[serde(default)]
	pub tracking_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestOrder {
	pub id: u64,
	pub name: String,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub financial_status: Option<String>,
	#[serde(default)]
	pub fulfillment_status: Option<String>,
	#[serde(default)]
	pub total_price: Option<String>,
	#[serde(default)]
	pub currency: Option<String>,
	#[serde(default)]
	pub line_items: Vec<RestOrderLineItem>,
	#[serde(default)]
	pub shipping_address: Option<RestAddress>,
	#[serde(default)]
	pub fulfillments: Vec<RestFulfillment>,
}

impl From<RestOrder> for AdminOrder {
	fn from(o: RestOrder) -> Self {
		let currency = o.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
		AdminOrder {
			id: o.id,
			name: o.name,
			created_at: o.created_at,
			financial_status: o.financial_status.unwrap_or_default(),
			fulfillment: FulfillmentStatus::from_wire(o.fulfillment_status.as_deref()),
			total_price: Money::parse(o.total_price.as_deref().unwrap_or("0.00"), currency),
			line_items: o
				.line_items
				.into_iter()
				.map(|li| OrderLineItem {
					title: li.title,
					quantity: li.quantity,
					price: li.price.as_deref().map(parse_price).unwrap_or_default(),
					variant_title: non_empty(li.variant_title),
					properties: li
						.properties
						.unwrap_or_default()
						.into_iter()
						.map(Into::into)
						.collect(),
				})
				.collect(),
			shipping_address: o.shipping_address.map(|a| ShippingAddress {
				first_name: a.first_name.unwrap_or_default(),
				last_name: a.last_name.unwrap_or_default(),
				address1: a.address1.unwrap_or_default(),
				address2: non_empty(a.address2),
				city: a.city.unwrap_or_default(),
				province: a.province.unwrap_or_default(),
				zip: a.zip.unwrap_or_default(),
				country: a.country.unwrap_or_default(),
			}),
			fulfillments: o
				.fulfillments
				.into_iter()
				.map(|f| Fulfillment {
					tracking_company: non_empty(f.tracking_company),
					tracking_number: non_empty(f.tracking_number),
					tracking_url: non_empty(f.tracking_url),
				})
				.collect(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrdersEnvelope {
	#[serde(default)]
	pub orders: Vec<RestOrder>,
}

/// Outgoing line item. Prices go out as two-decimal strings.
#[derive(Debug, Serialize)]
pub(crate) struct LineItemBody<'a> {
	pub title: &'a str,
	pub price: String,
	pub quantity: u32,
	pub requires_shipping: bool,
	pub properties: &'a [LineItemProperty],
}

impl<'a> From<&'a LineItem> for LineItemBody<'a> {
	fn from(li: &'a LineItem) -> Self {
		LineItemBody {
			title: &li.title,
			price: format!("{:.2}", li.price),
			quantity: li.quantity,
			requires_shipping: li.requires_shipping,
			properties: &li.properties,
		}
	}
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomerRef {
	pub id: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DraftOrderBody<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub line_items: Option<Vec<LineItemBody<'a>>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub customer: Option<CustomerRef>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tags: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<&'a str>,
}

impl<'a> From<&'a DraftOrderInput> for DraftOrderBody<'a> {
	/// Attaches the customer by id when known, otherwise keys the draft by email.
	fn from(input: &'a DraftOrderInput) -> Self {
		let customer = input.customer_id.map(|id| CustomerRef { id });
		DraftOrderBody {
			line_items: Some(input.line_items.iter().map(Into::into).collect()),
			email: if customer.is_none() {
				input.email.as_deref()
			} else {
				None
			},
			customer,
			tags: Some(input.tags.to_string()),
			note: Some(&input.note),
		}
	}
}

impl<'a> From<&'a DraftOrderUpdate> for DraftOrderBody<'a> {
	fn from(update: &'a DraftOrderUpdate) -> Self {
		DraftOrderBody {
			line_items: update
				.line_items
				.as_ref()
				.map(|items| items.iter().map(Into::into).collect()),
			customer: None,
			email: None,
			tags: None,
			note: update.note.as_deref(),
		}
	}
}

#[derive(Debug, Serialize)]
pub(crate) struct DraftOrderPayload<'a> {
	pub draft_order: DraftOrderBody<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomerPayload<'a> {
	pub customer: &'a archive_types::NewCustomer,
}

// ---------------------------------------------------------------------------
// GraphQL
// ---------------------------------------------------------------------------

/// Draft-order listing with everything the status projection needs.
pub(crate) const DRAFT_ORDERS_QUERY: &str = r#"
query DraftOrders($first: Int!, $query: String!, $reverse: Boolean!, $lineItems: Int!) {
  draftOrders(first: $first, query: $query, reverse: $reverse) {
    nodes {
      legacyResourceId
      name
      status
      tags
      note2
      email
      invoiceUrl
      createdAt
      customer { legacyResourceId email firstName lastName }
      lineItems(first: $lineItems) {
        nodes {
          title
          quantity
          originalUnitPriceSet { shopMoney { amount } }
          customAttributes { key value }
        }
      }
      order { legacyResourceId tags displayFulfillmentStatus cancelledAt }
      totalPriceSet { shopMoney { amount currencyCode } }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
	pub data: Option<T>,
	#[serde(default)]
	pub errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<T> {
	#[serde(default = "Vec::new")]
	pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DraftOrdersData {
	pub draft_orders: Nodes<GqlDraftOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlMoney {
	pub amount: String,
	#[serde(default)]
	pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlMoneyBag {
	pub shop_money: GqlMoney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlCustomer {
	pub legacy_resource_id: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlAttribute {
	pub key: String,
	#[serde(default)]
	pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlLineItem {
	#[serde(default)]
	pub title: String,
	#[serde(default = "one")]
	pub quantity: u32,
	#[serde(default)]
	pub original_unit_price_set: Option<GqlMoneyBag>,
	#[serde(default)]
	pub custom_attributes: Vec<GqlAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlOrder {
	pub legacy_resource_id: String,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub display_fulfillment_status: Option<String>,
	#[serde(default)]
	pub cancelled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlDraftOrder {
	pub legacy_resource_id: String,
	pub name: String,
	pub status: DraftOrderStatus,
	#[serde(default)]
	pub tags: TagSet,
	#[serde(default)]
	pub note2: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub invoice_url: Option<String>,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub customer: Option<GqlCustomer>,
	#[serde(default)]
	pub line_items: Option<Nodes<GqlLineItem>>,
	#[serde(default)]
	pub order: Option<GqlOrder>,
	#[serde(default)]
	pub total_price_set: Option<GqlMoneyBag>,
}

impl TryFrom<GqlDraftOrder> for DraftOrder {
	type Error = CommerceError;

	fn try_from(node: GqlDraftOrder) -> Result<Self, Self::Error> {
		let customer = node
			.customer
			.map(|c| -> Result<Customer, CommerceError> {
				Ok(Customer {
					id: parse_legacy_id(&c.legacy_resource_id)?,
					email: c.email.unwrap_or_default(),
					first_name: c.first_name.unwrap_or_default(),
					last_name: c.last_name.unwrap_or_default(),
				})
			})
			.transpose()?;

		let linked_order = node
			.order
			.map(|o| -> Result<LinkedOrder, CommerceError> {
				Ok(LinkedOrder {
					id: parse_legacy_id(&o.legacy_resource_id)?,
					tags: o.tags,
					fulfillment: FulfillmentStatus::from_wire(
						o.display_fulfillment_status.as_deref(),
					),
					cancelled: o.cancelled_at.is_some_and(|at| !at.is_empty()),
				})
			})
			.transpose()?;

		let total_price = match node.total_price_set {
			Some(bag) => Money::parse(
				&bag.shop_money.amount,
				bag.shop_money
					.currency_code
					.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
			),
			None => Money::zero(DEFAULT_CURRENCY),
		};

		let line_items = node
			.line_items
			.map(|c| c.nodes)
			.unwrap_or_default()
			.into_iter()
			.map(|li| LineItem {
				title: li.title,
				price: li
					.original_unit_price_set
					.map(|bag| parse_price(&bag.shop_money.amount))
					.unwrap_or_default(),
				quantity: li.quantity,
				requires_shipping: false,
				properties: li
					.custom_attributes
					.into_iter()
					.map(|a| LineItemProperty::new(a.key, a.value.unwrap_or_default()))
					.collect(),
			})
			.collect();

		Ok(DraftOrder {
			id: parse_legacy_id(&node.legacy_resource_id)?,
			name: node.name,
			status: node.status,
			created_at: node.created_at,
			invoice_url: non_empty(node.invoice_url),
			total_price,
			note: non_empty(node.note2),
			tags: node.tags,
			line_items,
			customer,
			email: non_empty(node.email),
			linked_order,
		})
	}
}

/// Converts listed draft orders, logging and skipping the ones that cannot
/// be read so one bad node does not hide the rest.
pub(crate) fn draft_orders_from_nodes(nodes: Vec<GqlDraftOrder>) -> Vec<DraftOrder> {
	nodes
		.into_iter()
		.filter_map(|node| {
			let raw_id = node.legacy_resource_id.clone();
			match DraftOrder::try_from(node) {
				Ok(draft) => Some(draft),
				Err(e) => {
					tracing::warn!(legacy_resource_id = %raw_id, error = %e, "Skipping unreadable draft order");
					None
				}
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn gql_node() -> serde_json::Value {
		json!({
			"legacyResourceId": "1001",
			"name": "#D7",
			"status": "INVOICE_SENT",
			"tags": ["digitisation-request", "Priority"],
			"note2": "Please scan in colour",
			"email": null,
			"invoiceUrl": "https://shop.example.com/invoices/abc",
			"createdAt": "2025-03-01T10:00:00Z",
			"customer": {
				"legacyResourceId": "55",
				"email": "a@example.com",
				"firstName": "Ada",
				"lastName": null
			},
			"lineItems": { "nodes": [{
				"title": "Map 1900",
				"quantity": 1,
				"originalUnitPriceSet": { "shopMoney": { "amount": "0.0" } },
				"customAttributes": [
					{ "key": "item_title", "value": "Map of Sydney 1900" },
					{ "key": "item_type", "value": "map" }
				]
			}]},
			"order": null,
			"totalPriceSet": { "shopMoney": { "amount": "45.5", "currencyCode": "AUD" } }
		})
	}

	#[test]
	fn test_graphql_node_normalised() {
		let node: GqlDraftOrder = serde_json::from_value(gql_node()).unwrap();
		let draft = DraftOrder::try_from(node).unwrap();

		assert_eq!(draft.id, 1001);
		assert_eq!(draft.status, DraftOrderStatus::InvoiceSent);
		assert!(draft.tags.contains("priority"));
		assert_eq!(draft.note.as_deref(), Some("Please scan in colour"));
		assert_eq!(draft.total_price.to_string(), "$45.50");
		assert_eq!(draft.owner_email(), Some("a@example.com"));
		assert_eq!(draft.line_items[0].property("item_type"), Some("map"));
		assert!(draft.linked_order.is_none());
	}

	#[test]
	fn test_graphql_linked_order_and_unknown_status() {
		let mut node = gql_node();
		node["status"] = json!("SOMETHING_NEW");
		node["order"] = json!({
			"legacyResourceId": "9001",
			"tags": ["Digitising"],
			"displayFulfillmentStatus": "FULFILLED",
			"cancelledAt": "2025-03-03T00:00:00Z"
		});
		let draft = DraftOrder::try_from(serde_json::from_value::<GqlDraftOrder>(node).unwrap())
			.unwrap();

		assert_eq!(draft.status, DraftOrderStatus::Open);
		let order = draft.linked_order.unwrap();
		assert_eq!(order.id, 9001);
		assert!(order.tags.contains("digitising"));
		assert_eq!(order.fulfillment, FulfillmentStatus::Fulfilled);
		assert!(order.cancelled);
	}

	#[test]
	fn test_graphql_bad_id_rejected() {
		let mut node = gql_node();
		node["legacyResourceId"] = json!("gid://nope");
		let node: GqlDraftOrder = serde_json::from_value(node).unwrap();
		assert!(matches!(
			DraftOrder::try_from(node),
			Err(CommerceError::Serialization(_))
		));
	}

	#[test]
	fn test_unreadable_nodes_skipped() {
		let mut bad_draft = gql_node();
		bad_draft["legacyResourceId"] = json!("gid://nope");
		let mut bad_customer = gql_node();
		bad_customer["legacyResourceId"] = json!("1003");
		bad_customer["customer"]["legacyResourceId"] = json!("");
		let mut good = gql_node();
		good["legacyResourceId"] = json!("1002");

		let nodes: Vec<GqlDraftOrder> =
			serde_json::from_value(json!([gql_node(), bad_draft, bad_customer, good])).unwrap();
		let ids: Vec<u64> = draft_orders_from_nodes(nodes).iter().map(|d| d.id).collect();
		assert_eq!(ids, vec![1001, 1002]);
	}

	#[test]
	fn test_rest_draft_normalised() {
		let envelope: DraftOrderEnvelope = serde_json::from_value(json!({
			"draft_order": {
				"id": 1001,
				"name": "#D7",
				"status": "open",
				"created_at": "2025-03-01T21:00:00+11:00",
				"invoice_url": "",
				"total_price": "0.00",
				"currency": "AUD",
				"note": null,
				"tags": "digitisation-request, Rush",
				"line_items": [{
					"title": "Photo 1910",
					"price": "0.00",
					"quantity": 1,
					"requires_shipping": false,
					"properties": [{ "name": "item_id", "value": "R123" }]
				}],
				"customer": null,
				"email": "b@example.com",
				"order_id": null
			}
		}))
		.unwrap();
		let draft = envelope.draft_order.into_draft(None);

		assert_eq!(draft.created_at.to_rfc3339(), "2025-03-01T10:00:00+00:00");
		assert!(draft.invoice_url.is_none());
		assert!(draft.note.is_none());
		assert!(draft.tags.contains("rush"));
		assert_eq!(draft.owner_email(), Some("b@example.com"));
		assert_eq!(draft.line_items[0].property("item_id"), Some("R123"));
	}

	#[test]
	fn test_create_body_prefers_customer_id() {
		let input = DraftOrderInput {
			line_items: vec![LineItem {
				title: "Map".into(),
				price: Decimal::ZERO,
				quantity: 1,
				requires_shipping: false,
				properties: vec![LineItemProperty::new("item_id", "R1")],
			}],
			customer_id: Some(55),
			email: Some("a@example.com".into()),
			tags: TagSet::single("digitisation-request"),
			note: "hello".into(),
		};
		let body = serde_json::to_value(DraftOrderPayload {
			draft_order: (&input).into(),
		})
		.unwrap();

		assert_eq!(body["draft_order"]["customer"]["id"], 55);
		assert!(body["draft_order"].get("email").is_none());
		assert_eq!(body["draft_order"]["tags"], "digitisation-request");
		assert_eq!(body["draft_order"]["line_items"][0]["price"], "0.00");
		assert_eq!(
			body["draft_order"]["line_items"][0]["properties"][0]["name"],
			"item_id"
		);
	}

	#[test]
	fn test_update_body_only_sends_changes() {
		let update = DraftOrderUpdate {
			line_items: None,
			note: Some("a\n---\nb".into()),
		};
		let body = serde_json::to_value(DraftOrderPayload {
			draft_order: (&update).into(),
		})
		.unwrap();
		assert_eq!(body, json!({ "draft_order": { "note": "a\n---\nb" } }));
	}

	#[test]
	fn test_rest_order_normalised() {
		let envelope: OrdersEnvelope = serde_json::from_value(json!({
			"orders": [{
				"id": 5,
				"name": "#1042",
				"created_at": "2025-02-01T00:00:00Z",
				"financial_status": "paid",
				"fulfillment_status": null,
				"total_price": "120.00",
				"currency": "AUD",
				"line_items": [{ "title": "Print", "quantity": 2, "price": "60.00", "variant_title": "A3", "properties": null }],
				"fulfillments": [{ "tracking_company": "AusPost", "tracking_number": "XYZ", "tracking_url": null }]
			}]
		}))
		.unwrap();
		let order = AdminOrder::from(envelope.orders.into_iter().next().unwrap());

		assert_eq!(order.fulfillment, FulfillmentStatus::Unfulfilled);
		assert_eq!(order.line_items[0].variant_title.as_deref(), Some("A3"));
		assert_eq!(order.fulfillments[0].tracking_number.as_deref(), Some("XYZ"));
		assert!(order.shipping_address.is_none());
	}
}
