//! Checkout and the order status workflow.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    order_item::{self, Entity as OrderItemEntity},
    product::{self, Entity as ProductEntity},
    user::{self, Entity as UserEntity},
    DEFAULT_CURRENCY,
};
use crate::error::{AppError, AppResult};
use crate::services::accounts::find_or_create_guest;

/// Who is placing the order.
#[derive(Clone, Debug)]
pub enum Customer {
    Session(i32),
    Guest { name: Option<String>, email: String },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub items: Vec<OrderLine>,
    pub address: String,
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: OrderDetails,
    pub is_guest_order: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<OrderItemDetails>,
    pub customer: Option<Contact>,
    pub cook: Option<Contact>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetails {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub product: Option<ProductBrief>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBrief {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub image: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Filters for order listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderScope {
    pub status: Option<Status>,
    pub customer_id: Option<i32>,
}

/// Places an order priced from the store, never from the request.
///
/// Writes the order and its items; callers run it in a transaction so a
/// failure part way leaves nothing behind.
pub async fn place_order<C: ConnectionTrait>(
    db: &C,
    customer: Customer,
    new: NewOrder,
) -> AppResult<PlacedOrder> {
    if new.items.is_empty() {
        return Err(AppError::Validation("Invalid items".into()));
    }
    if new.address.trim().is_empty() || new.phone.trim().is_empty() {
        return Err(AppError::Validation("Address and phone are required".into()));
    }
    if new.items.iter().any(|line| line.quantity < 1) {
        return Err(AppError::Validation("Quantity must be at least 1".into()));
    }

    let mut cook_id = None;
    let mut total = 0.0;
    let mut priced = Vec::with_capacity(new.items.len());

    for line in &new.items {
        // Only products visible in the catalogue can be ordered.
        let product = ProductEntity::find_by_id(line.product_id)
            .filter(product::Column::IsApproved.eq(true))
            .filter(product::Column::IsAvailable.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", line.product_id)))?;

        match cook_id {
            None => cook_id = Some(product.cook_id),
            Some(cook) if cook != product.cook_id => {
                return Err(AppError::Validation(
                    "All items must be from the same cook".into(),
                ));
            }
            Some(_) => {}
        }

        total += product.price * f64::from(line.quantity);
        priced.push((line.product_id, line.quantity, product.price));
    }

    // Items are non-empty, so a cook was found.
    let cook_id = cook_id.ok_or_else(|| AppError::Validation("Invalid items".into()))?;

    let (customer_id, is_guest_order) = match customer {
        Customer::Session(user_id) => (user_id, false),
        Customer::Guest { name, email } => {
            let guest = find_or_create_guest(db, name.as_deref(), &email).await?;
            (guest.id, true)
        }
    };

    let now = Utc::now();
    let order = order::ActiveModel {
        customer_id: Set(customer_id),
        cook_id: Set(cook_id),
        status: Set(Status::Pending),
        total: Set(total),
        currency: Set(DEFAULT_CURRENCY.to_owned()),
        address: Set(new.address.trim().to_owned()),
        phone: Set(new.phone.trim().to_owned()),
        notes: Set(new.notes.filter(|n| !n.trim().is_empty())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for (product_id, quantity, price) in priced {
        order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            price: Set(price),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    info!(order_id = order.id, customer_id, cook_id, total, is_guest_order, "Order placed");

    let order = details_for(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Placed order vanished".into()))?;

    Ok(PlacedOrder {
        order,
        is_guest_order,
    })
}

/// Moves an order along the workflow. Non-empty notes replace the old ones.
pub async fn update_status<C: ConnectionTrait>(
    db: &C,
    id: i32,
    target: Status,
    notes: Option<String>,
) -> AppResult<OrderDetails> {
    let order = OrderEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let current = order.status;
    if !current.can_transition_to(target) {
        return Err(AppError::Validation(format!(
            "Cannot change order status from {} to {}",
            current, target
        )));
    }

    let mut order: order::ActiveModel = order.into();
    order.status = Set(target);
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        order.notes = Set(Some(notes));
    }
    order.updated_at = Set(Utc::now());
    let order = order.update(db).await?;

    info!(order_id = id, from = %current, to = %target, "Order status changed");

    details_for(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Updated order vanished".into()))
}

pub async fn order_details<C: ConnectionTrait>(
    db: &C,
    id: i32,
    scope: OrderScope,
) -> Result<Option<OrderDetails>, DbErr> {
    let order = OrderEntity::find_by_id(id)
        .filter(scope_condition(scope))
        .one(db)
        .await?;

    match order {
        Some(order) => Ok(details_for(db, vec![order]).await?.pop()),
        None => Ok(None),
    }
}

/// Orders in scope, newest first.
pub async fn list_orders<C: ConnectionTrait>(
    db: &C,
    scope: OrderScope,
) -> Result<Vec<OrderDetails>, DbErr> {
    let orders = OrderEntity::find()
        .filter(scope_condition(scope))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;

    details_for(db, orders).await
}

fn scope_condition(scope: OrderScope) -> Condition {
    let mut condition = Condition::all();
    if let Some(status) = scope.status {
        condition = condition.add(order::Column::Status.eq(status));
    }
    if let Some(customer_id) = scope.customer_id {
        condition = condition.add(order::Column::CustomerId.eq(customer_id));
    }
    condition
}

async fn details_for<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderDetails>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let mut product_ids: Vec<i32> = items.iter().map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let products: HashMap<i32, product::Model> = ProductEntity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut user_ids: Vec<i32> = orders
        .iter()
        .flat_map(|o| [o.customer_id, o.cook_id])
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let users: HashMap<i32, user::Model> = UserEntity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut items_by_order: HashMap<i32, Vec<OrderItemDetails>> = HashMap::new();
    for item in items {
        let product = products.get(&item.product_id).map(|p| ProductBrief {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            image: p.image.clone(),
        });
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemDetails { item, product });
    }

    let contact = |id: i32| {
        users.get(&id).map(|u| Contact {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
        })
    };

    Ok(orders
        .into_iter()
        .map(|order| OrderDetails {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            customer: contact(order.customer_id),
            cook: contact(order.cook_id),
            order,
        })
        .collect())
}
