//! Customer order history.
//!
//! Paid requests become finalised orders. Their delivery progress is derived
//! from the order's fulfillment state alone.

use archive_types::{
	property_keys, AddressSummary, AdminOrder, CustomerOrderSummary, FulfillmentStatus, Money,
	OrderItemSummary, OrderStatus, ShippingAddress,
};

/// Variant shown for line items without one.
const DEFAULT_VARIANT: &str = "Standard";

pub fn order_status(fulfillment: FulfillmentStatus) -> OrderStatus {
	match fulfillment {
		FulfillmentStatus::Fulfilled => OrderStatus::Delivered,
		FulfillmentStatus::Restocked => OrderStatus::Cancelled,
		FulfillmentStatus::Unfulfilled | FulfillmentStatus::Partial | FulfillmentStatus::Other => {
			OrderStatus::Processing
		}
	}
}

fn address_summary(address: &ShippingAddress) -> AddressSummary {
	let line1 = match address.address2.as_deref().filter(|a| !a.is_empty()) {
		Some(address2) => format!("{}, {}", address.address1, address2),
		None => address.address1.clone(),
	};
	AddressSummary {
		name: format!("{} {}", address.first_name, address.last_name)
			.trim()
			.to_string(),
		line1,
		city: address.city.clone(),
		state: address.province.clone(),
		postcode: address.zip.clone(),
		country: address.country.clone(),
	}
}

/// Projects an admin order into the customer's order history entry.
pub fn project_order(order: &AdminOrder) -> CustomerOrderSummary {
	let status = order_status(order.fulfillment);
	let tracking = order.fulfillments.first();
	let currency = &order.total_price.currency_code;

	let items = order
		.line_items
		.iter()
		.map(|item| OrderItemSummary {
			title: item
				.property(property_keys::ITEM_TITLE)
				.unwrap_or(&item.title)
				.to_string(),
			variant: item
				.variant_title
				.clone()
				.filter(|v| !v.is_empty())
				.unwrap_or_else(|| DEFAULT_VARIANT.to_string()),
			price: Money::new(item.price, currency.clone()),
			quantity: item.quantity,
			image: item
				.property(property_keys::ITEM_IMAGE)
				.unwrap_or_default()
				.to_string(),
		})
		.collect();

	CustomerOrderSummary {
		id: order.name.clone(),
		placed_at: order.created_at,
		status,
		total: order.total_price.clone(),
		item_count: order.line_items.iter().map(|item| item.quantity).sum(),
		tracking_number: tracking.and_then(|f| f.tracking_number.clone()),
		carrier: tracking.and_then(|f| f.tracking_company.clone()),
		items,
		shipping_address: order.shipping_address.as_ref().map(address_summary),
		current_step: status.step(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use archive_types::{Fulfillment, LineItemProperty, OrderLineItem};
	use chrono::Utc;
	use rust_decimal::Decimal;

	fn order() -> AdminOrder {
		AdminOrder {
			id: 5,
			name: "#1005".into(),
			created_at: Utc::now(),
			financial_status: "paid".into(),
			fulfillment: FulfillmentStatus::Unfulfilled,
			total_price: Money::new(Decimal::new(9000, 2), "AUD"),
			line_items: vec![
				OrderLineItem {
					title: "Digitisation Request".into(),
					quantity: 2,
					price: Decimal::new(4500, 2),
					variant_title: None,
					properties: vec![
						LineItemProperty::new("item_title", "Map 1900"),
						LineItemProperty::new("item_image", "https://img.example/map.jpg"),
					],
				},
				OrderLineItem {
					title: "USB copy".into(),
					quantity: 1,
					price: Decimal::ZERO,
					variant_title: Some("8GB".into()),
					properties: vec![],
				},
			],
			shipping_address: None,
			fulfillments: vec![],
		}
	}

	#[test]
	fn test_fulfillment_mapping() {
		assert_eq!(order_status(FulfillmentStatus::Unfulfilled), OrderStatus::Processing);
		assert_eq!(order_status(FulfillmentStatus::Partial), OrderStatus::Processing);
		assert_eq!(order_status(FulfillmentStatus::Other), OrderStatus::Processing);
		assert_eq!(order_status(FulfillmentStatus::Fulfilled), OrderStatus::Delivered);
		assert_eq!(order_status(FulfillmentStatus::Restocked), OrderStatus::Cancelled);
		assert_eq!(OrderStatus::Cancelled.step(), 1);
		assert_eq!(OrderStatus::Delivered.step(), 5);
	}

	#[test]
	fn test_project_unfulfilled_order() {
		let summary = project_order(&order());
		assert_eq!(summary.id, "#1005");
		assert_eq!(summary.status, OrderStatus::Processing);
		assert_eq!(summary.current_step, 2);
		assert_eq!(summary.item_count, 3);
		assert_eq!(summary.items[0].title, "Map 1900");
		assert_eq!(summary.items[0].variant, "Standard");
		assert_eq!(summary.items[0].image, "https://img.example/map.jpg");
		assert_eq!(summary.items[1].title, "USB copy");
		assert_eq!(summary.items[1].variant, "8GB");
		assert_eq!(summary.total.to_string(), "$90.00");
		assert!(summary.tracking_number.is_none());
		assert!(summary.shipping_address.is_none());
	}

	#[test]
	fn test_project_delivered_order_with_tracking() {
		let mut o = order();
		o.fulfillment = FulfillmentStatus::Fulfilled;
		o.fulfillments = vec![
			Fulfillment {
				tracking_company: Some("Australia Post".into()),
				tracking_number: Some("AP123".into()),
				tracking_url: None,
			},
			Fulfillment {
				tracking_company: Some("Other".into()),
				tracking_number: Some("X".into()),
				tracking_url: None,
			},
		];
		o.shipping_address = Some(ShippingAddress {
			first_name: "Ada".into(),
			last_name: "Lovelace".into(),
			address1: "1 Archive Way".into(),
			address2: Some("Unit 2".into()),
			city: "Canberra".into(),
			province: "ACT".into(),
			zip: "2600".into(),
			country: "Australia".into(),
		});

		let summary = project_order(&o);
		assert_eq!(summary.status, OrderStatus::Delivered);
		assert_eq!(summary.current_step, 5);
		assert_eq!(summary.tracking_number.as_deref(), Some("AP123"));
		assert_eq!(summary.carrier.as_deref(), Some("Australia Post"));
		let address = summary.shipping_address.unwrap();
		assert_eq!(address.name, "Ada Lovelace");
		assert_eq!(address.line1, "1 Archive Way, Unit 2");
		assert_eq!(address.state, "ACT");
	}
}
