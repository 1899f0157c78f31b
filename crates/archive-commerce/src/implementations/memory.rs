//! In-memory commerce platform.
//!
//! Behaves like the Admin API for everything the workspace uses, and adds
//! the back-office actions (send invoice, complete, tag, fulfil, cancel)
//! so tests can walk a request through its whole lifecycle. Cloning shares
//! the underlying state.

use crate::{CommerceError, CommerceFactory, CommerceInterface, CommerceRegistry};
use archive_types::{
	emails_match, AdminOrder, ConfigSchema, Customer, DraftOrder, DraftOrderInput,
	DraftOrderQuery, DraftOrderStatus, DraftOrderUpdate, FulfillmentStatus,
	ImplementationRegistry, LinkedOrder, Money, NewCustomer, Schema, ValidationError,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const CURRENCY: &str = "AUD";

#[derive(Default)]
struct State {
	next_id: u64,
	customers: Vec<Customer>,
	drafts: BTreeMap<u64, DraftOrder>,
	/// Finalised orders with the email they were placed under.
	orders: Vec<(String, AdminOrder)>,
}

impl State {
	fn allocate_id(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn draft_mut(&mut self, id: u64) -> Result<&mut DraftOrder, CommerceError> {
		self.drafts
			.get_mut(&id)
			.ok_or_else(|| CommerceError::NotFound(format!("draft order {}", id)))
	}

	fn linked_order_mut(&mut self, draft_id: u64) -> Result<&mut LinkedOrder, CommerceError> {
		self.draft_mut(draft_id)?.linked_order.as_mut().ok_or_else(|| {
			CommerceError::NotFound(format!("order for draft order {}", draft_id))
		})
	}
}

/// Commerce platform held entirely in memory.
#[derive(Clone, Default)]
pub struct InMemoryCommerce {
	state: Arc<RwLock<State>>,
}

impl InMemoryCommerce {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a draft as-is, e.g. one with line items lacking properties.
	/// Returns the id it was stored under.
	pub async fn insert_draft(&self, mut draft: DraftOrder) -> u64 {
		let mut state = self.state.write().await;
		let id = state.allocate_id();
		draft.id = id;
		state.drafts.insert(id, draft);
		id
	}

	/// Sends the invoice for a draft, quoting `total`.
	pub async fn send_invoice(&self, draft_id: u64, total: Decimal) -> Result<(), CommerceError> {
		let mut state = self.state.write().await;
		let draft = state.draft_mut(draft_id)?;
		draft.status = DraftOrderStatus::InvoiceSent;
		draft.total_price = Money::new(total, CURRENCY);
		draft.invoice_url = Some(format!("https://checkout.example/invoices/{}", draft_id));
		Ok(())
	}

	/// Marks the draft paid, creating the linked order. Returns the order id.
	pub async fn complete_draft(&self, draft_id: u64) -> Result<u64, CommerceError> {
		let mut state = self.state.write().await;
		let order_id = state.allocate_id();
		let draft = state.draft_mut(draft_id)?;
		draft.status = DraftOrderStatus::Completed;
		draft.linked_order = Some(LinkedOrder {
			id: order_id,
			tags: Default::default(),
			fulfillment: FulfillmentStatus::Unfulfilled,
			cancelled: false,
		});

		let order = AdminOrder {
			id: order_id,
			name: format!("#{}", 1000 + order_id),
			created_at: Utc::now(),
			financial_status: "paid".to_string(),
			fulfillment: FulfillmentStatus::Unfulfilled,
			total_price: draft.total_price.clone(),
			line_items: Vec::new(),
			shipping_address: None,
			fulfillments: Vec::new(),
		};
		let email = draft.owner_email().unwrap_or_default().to_string();
		state.orders.push((email, order));
		Ok(order_id)
	}

	/// Tags the order linked to a draft.
	pub async fn tag_order(&self, draft_id: u64, tag: &str) -> Result<(), CommerceError> {
		let mut state = self.state.write().await;
		state.linked_order_mut(draft_id)?.tags.insert(tag);
		Ok(())
	}

	pub async fn fulfill_order(&self, draft_id: u64) -> Result<(), CommerceError> {
		let mut state = self.state.write().await;
		let linked = state.linked_order_mut(draft_id)?;
		linked.fulfillment = FulfillmentStatus::Fulfilled;
		let order_id = linked.id;
		if let Some((_, order)) = state.orders.iter_mut().find(|(_, o)| o.id == order_id) {
			order.fulfillment = FulfillmentStatus::Fulfilled;
		}
		Ok(())
	}

	pub async fn cancel_order(&self, draft_id: u64) -> Result<(), CommerceError> {
		let mut state = self.state.write().await;
		state.linked_order_mut(draft_id)?.cancelled = true;
		Ok(())
	}

	/// Adds a finalised order to `email`'s history.
	pub async fn insert_order(&self, email: &str, order: AdminOrder) {
		let mut state = self.state.write().await;
		state.orders.push((email.to_string(), order));
	}

	pub async fn draft_count(&self) -> usize {
		self.state.read().await.drafts.len()
	}
}

#[async_trait]
impl CommerceInterface for InMemoryCommerce {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(InMemoryCommerceSchema)
	}

	async fn search_customers(&self, email: &str) -> Result<Vec<Customer>, CommerceError> {
		let state = self.state.read().await;
		Ok(state
			.customers
			.iter()
			.filter(|c| emails_match(&c.email, email))
			.cloned()
			.collect())
	}

	async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, CommerceError> {
		let mut state = self.state.write().await;
		let created = Customer {
			id: state.allocate_id(),
			email: customer.email.clone(),
			first_name: customer.first_name.clone(),
			last_name: customer.last_name.clone(),
		};
		state.customers.push(created.clone());
		Ok(created)
	}

	async fn search_draft_orders(
		&self,
		query: &DraftOrderQuery,
	) -> Result<Vec<DraftOrder>, CommerceError> {
		let state = self.state.read().await;
		let matching = state.drafts.values().filter(|d| {
			d.tags.contains(&query.tag) && query.status.is_none_or(|status| d.status == status)
		});
		let ordered: Box<dyn Iterator<Item = &DraftOrder>> = if query.reverse {
			Box::new(matching.rev())
		} else {
			Box::new(matching)
		};

		Ok(ordered
			.take(query.limit as usize)
			.map(|d| {
				let mut d = d.clone();
				d.line_items.truncate(query.line_items_limit as usize);
				d
			})
			.collect())
	}

	async fn get_draft_order(&self, id: u64) -> Result<DraftOrder, CommerceError> {
		let state = self.state.read().await;
		state
			.drafts
			.get(&id)
			.cloned()
			.ok_or_else(|| CommerceError::NotFound(format!("draft order {}", id)))
	}

	async fn create_draft_order(
		&self,
		input: &DraftOrderInput,
	) -> Result<DraftOrder, CommerceError> {
		let mut state = self.state.write().await;
		let customer = match input.customer_id {
			Some(id) => Some(
				state
					.customers
					.iter()
					.find(|c| c.id == id)
					.cloned()
					.ok_or_else(|| CommerceError::Upstream {
						status: 422,
						body: format!("{{\"errors\":{{\"customer\":[\"{} not found\"]}}}}", id),
					})?,
			),
			None => None,
		};

		let id = state.allocate_id();
		let draft = DraftOrder {
			id,
			name: format!("#D{}", 1000 + id),
			status: DraftOrderStatus::Open,
			created_at: Utc::now(),
			invoice_url: None,
			total_price: Money::zero(CURRENCY),
			note: Some(input.note.clone()).filter(|n| !n.is_empty()),
			tags: input.tags.clone(),
			line_items: input.line_items.clone(),
			email: match &customer {
				Some(c) => Some(c.email.clone()),
				None => input.email.clone(),
			},
			customer,
			linked_order: None,
		};
		state.drafts.insert(id, draft.clone());
		Ok(draft)
	}

	async fn update_draft_order(
		&self,
		id: u64,
		update: &DraftOrderUpdate,
	) -> Result<DraftOrder, CommerceError> {
		let mut state = self.state.write().await;
		let draft = state.draft_mut(id)?;
		if let Some(line_items) = &update.line_items {
			draft.line_items = line_items.clone();
		}
		if let Some(note) = &update.note {
			draft.note = Some(note.clone()).filter(|n| !n.is_empty());
		}
		Ok(draft.clone())
	}

	async fn delete_draft_order(&self, id: u64) -> Result<(), CommerceError> {
		let mut state = self.state.write().await;
		state
			.drafts
			.remove(&id)
			.map(|_| ())
			.ok_or_else(|| CommerceError::NotFound(format!("draft order {}", id)))
	}

	async fn list_orders(
		&self,
		email: &str,
		limit: u32,
	) -> Result<Vec<AdminOrder>, CommerceError> {
		let state = self.state.read().await;
		let mut orders: Vec<AdminOrder> = state
			.orders
			.iter()
			.filter(|(owner, _)| emails_match(owner, email))
			.map(|(_, order)| order.clone())
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
		orders.truncate(limit as usize);
		Ok(orders)
	}
}

/// Configuration schema for the in-memory platform. Takes no options.
pub struct InMemoryCommerceSchema;

impl ConfigSchema for InMemoryCommerceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_commerce(config: &toml::Value) -> Result<Box<dyn CommerceInterface>, CommerceError> {
	InMemoryCommerceSchema
		.validate(config)
		.map_err(|e| CommerceError::Configuration(e.to_string()))?;
	Ok(Box::new(InMemoryCommerce::new()))
}

/// Registry for the in-memory implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = CommerceFactory;

	fn factory() -> Self::Factory {
		create_commerce
	}
}

impl CommerceRegistry for Registry {}
