use std::{fmt::Display, str::FromStr};

use bistro_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The opaque public identifier of an order. Assigned at creation and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  FulfillmentStatus  ---------------------------------------------------------
/// The kitchen-facing progress state of an order. Independent of the payment axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// The order has been placed and no one has started preparing it.
    Pending,
    /// A staff member has started preparing the order.
    Cooking,
    /// The order is ready for collection. The owner is notified on entry into this state.
    Ready,
    /// The order has been handed over. Terminal.
    Completed,
    /// The order was cancelled before preparation started. Terminal.
    Cancelled,
}

impl FulfillmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfillmentStatus::Completed | FulfillmentStatus::Cancelled)
    }
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Pending => write!(f, "Pending"),
            FulfillmentStatus::Cooking => write!(f, "Cooking"),
            FulfillmentStatus::Ready => write!(f, "Ready"),
            FulfillmentStatus::Completed => write!(f, "Completed"),
            FulfillmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Cooking" => Ok(Self::Cooking),
            "Ready" => Ok(Self::Ready),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid fulfillment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
/// The financial settlement state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No successful payment has been recorded yet.
    Pending,
    /// Payment received in full. No further mutation of this axis is expected.
    Paid,
    /// The most recent payment attempt failed. A new attempt may be initiated.
    Failed,
    /// The order was cancelled; any in-flight payment attempt is void.
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Esewa,
    Khalti,
}

impl PaymentMethod {
    /// Whether this method settles through an online gateway (and therefore has transaction references).
    pub fn is_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Esewa | PaymentMethod::Khalti)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::Esewa => write!(f, "Esewa"),
            PaymentMethod::Khalti => write!(f, "Khalti"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "esewa" => Ok(Self::Esewa),
            "khalti" => Ok(Self::Khalti),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Chef,
    Admin,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Chef | Role::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Chef => write!(f, "chef"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "chef" => Ok(Self::Chef),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------
/// One line of an order. Quantity and unit price are snapshotted at order creation and never recomputed from the
/// menu catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LineItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * i64::from(self.quantity)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total_price: Money,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    /// The transaction reference of the most recent payment attempt. Overwritten on every new initiation; an outcome
    /// only applies when its reference equals this value.
    pub gateway_ref: Option<String>,
    /// The staff member who started preparing the order. Set on the Pending → Cooking transition.
    pub assigned_staff: Option<String>,
    /// Optimistic-concurrency counter. Every mutation carries a version check; see the store contract.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, actor_id: &str) -> bool {
        self.customer_id == actor_id
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    pub fn new(customer_id: String, items: Vec<LineItem>, payment_method: PaymentMethod) -> Self {
        Self { customer_id, items, payment_method }
    }

    /// The order total, computed once from the line-item snapshot. This becomes the authoritative `total_price`.
    pub fn total_price(&self) -> Money {
        self.items.iter().map(LineItem::subtotal).sum()
    }
}

//--------------------------------------   PaymentOutcome    ---------------------------------------------------------
/// The normalized result of a payment attempt, as reported by a gateway adapter. Whether the gateway pushes
/// callbacks or is polled via a lookup endpoint, the reconciliation engine only ever sees this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub status: OutcomeStatus,
    /// The settled amount, converted back to paisa. Must exactly equal the order's total price.
    pub amount: Money,
    /// The transaction reference this outcome belongs to.
    pub txref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Paid,
    Failed,
    /// The gateway has not settled the attempt (or the result is unknown, e.g. after a timeout). Never mutates order
    /// state; safe to retry via the lookup path.
    Pending,
}

impl Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Paid => write!(f, "Paid"),
            OutcomeStatus::Failed => write!(f, "Failed"),
            OutcomeStatus::Pending => write!(f, "Pending"),
        }
    }
}
