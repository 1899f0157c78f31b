//! Conversion between archive items and draft-order line items.
//!
//! Item data travels on the line item as custom properties, keyed by
//! [`property_keys`]. Line items carry no price: a request is quoted later by
//! staff, so every item goes in at zero and needs no shipping.

use archive_types::{property_keys, ArchiveItem, LineItem, LineItemProperty, RequestItem};
use rust_decimal::Decimal;

/// Title used for a line item whose item has no title of its own.
pub const DEFAULT_LINE_TITLE: &str = "Digitisation Request";

/// Title shown for a line item that carries neither a title property nor a
/// raw title.
pub const UNKNOWN_ITEM_TITLE: &str = "Unknown item";

/// Builds the line item submitted for `item`.
pub fn line_item_for(item: &ArchiveItem) -> LineItem {
	let title = if item.title.trim().is_empty() {
		DEFAULT_LINE_TITLE.to_string()
	} else {
		item.title.clone()
	};

	LineItem {
		title,
		price: Decimal::ZERO,
		quantity: 1,
		requires_shipping: false,
		properties: vec![
			LineItemProperty::new(property_keys::ITEM_ID, &item.id),
			LineItemProperty::new(property_keys::ITEM_TYPE, &item.item_type),
			LineItemProperty::new(property_keys::ITEM_TITLE, &item.title),
			LineItemProperty::new(property_keys::CONTROL_SYMBOL, &item.control_symbol),
			LineItemProperty::new(property_keys::BARCODE, &item.barcode),
			LineItemProperty::new(property_keys::SERIES_NUMBER, &item.series),
			LineItemProperty::new(property_keys::ITEM_IMAGE, &item.image),
		],
	}
}

/// Recovers the submitted item from a line item.
///
/// Properties that are missing come back empty; the title falls back to the
/// raw line-item title so that resubmitting keeps something recognisable.
pub fn captured_item(line: &LineItem) -> ArchiveItem {
	let prop = |name: &str| line.property(name).unwrap_or_default().to_string();
	ArchiveItem {
		id: prop(property_keys::ITEM_ID),
		title: line
			.property(property_keys::ITEM_TITLE)
			.unwrap_or(&line.title)
			.to_string(),
		item_type: prop(property_keys::ITEM_TYPE),
		control_symbol: prop(property_keys::CONTROL_SYMBOL),
		barcode: prop(property_keys::BARCODE),
		series: prop(property_keys::SERIES_NUMBER),
		image: prop(property_keys::ITEM_IMAGE),
	}
}

/// The item as shown on a request card. Never dropped, whatever it carries.
pub fn request_item(line: &LineItem) -> RequestItem {
	let title = line
		.property(property_keys::ITEM_TITLE)
		.or(Some(line.title.as_str()).filter(|t| !t.trim().is_empty()))
		.unwrap_or(UNKNOWN_ITEM_TITLE);

	RequestItem {
		title: title.to_string(),
		item_type: line
			.property(property_keys::ITEM_TYPE)
			.unwrap_or_default()
			.to_string(),
		image: line
			.property(property_keys::ITEM_IMAGE)
			.unwrap_or_default()
			.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn map_item() -> ArchiveItem {
		ArchiveItem {
			id: "NAA-1".into(),
			title: "Map 1900".into(),
			item_type: "map".into(),
			control_symbol: "CS/1".into(),
			barcode: "123456".into(),
			series: "A1".into(),
			image: "https://img.example/map.jpg".into(),
		}
	}

	#[test]
	fn test_line_item_is_free_and_unshipped() {
		let line = line_item_for(&map_item());
		assert_eq!(line.title, "Map 1900");
		assert_eq!(line.price, Decimal::ZERO);
		assert_eq!(line.quantity, 1);
		assert!(!line.requires_shipping);
		assert_eq!(line.properties.len(), 7);
		assert_eq!(line.property(property_keys::SERIES_NUMBER), Some("A1"));
	}

	#[test]
	fn test_untitled_item_gets_default_line_title() {
		let line = line_item_for(&ArchiveItem::default());
		assert_eq!(line.title, DEFAULT_LINE_TITLE);
		assert_eq!(line.property(property_keys::ITEM_TITLE), None);
	}

	#[test]
	fn test_captured_item_matches_submission() {
		assert_eq!(captured_item(&line_item_for(&map_item())), map_item());
	}

	#[test]
	fn test_plain_line_item_uses_raw_title() {
		let line = LineItem {
			title: "Custom scan".into(),
			price: Decimal::ONE,
			quantity: 1,
			requires_shipping: true,
			properties: vec![],
		};
		assert_eq!(request_item(&line).title, "Custom scan");
		assert_eq!(captured_item(&line).title, "Custom scan");
		assert_eq!(captured_item(&line).barcode, "");
	}

	#[test]
	fn test_blank_line_item_is_unknown() {
		let line = LineItem {
			title: String::new(),
			price: Decimal::ZERO,
			quantity: 1,
			requires_shipping: false,
			properties: vec![],
		};
		let item = request_item(&line);
		assert_eq!(item.title, UNKNOWN_ITEM_TITLE);
		assert_eq!(item.item_type, "");
	}
}
