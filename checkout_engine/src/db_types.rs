use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use scg_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created but the payment transfer has not arrived yet.
    PendingPayment,
    /// The payment settled in full and the order is waiting for the seller to hand it over.
    PendingPickup,
    /// The order was cancelled, either manually by the buyer or by the payment timeout sweep.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::PendingPayment => write!(f, "PendingPayment"),
            OrderStatusType::PendingPickup => write!(f, "PendingPickup"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "PendingPickup" => Ok(Self::PendingPickup),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PendingPayment");
            OrderStatusType::PendingPayment
        })
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// The checkout committed and the gateway transfer is awaited.
    Pending,
    /// The transfer arrived and matched the order total.
    Success,
    /// The payment window elapsed without a matching transfer.
    Failed,
}

impl PaymentStatusType {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Success => write!(f, "Success"),
            PaymentStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatusType::Pending
        })
    }
}

//--------------------------------------        Sku          ---------------------------------------------------------
/// A purchasable product variant with its own price and stock.
///
/// `version` is a monotonic counter that acts as the optimistic-concurrency token for stock writes. It is bumped
/// by every guarded decrement and by catalog edits; a decrement that carries a stale version is rejected.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sku {
    pub id: i64,
    pub product_id: i64,
    pub seller_id: i64,
    /// The variant value, e.g. "Red-Large"
    pub variant: String,
    pub price: Cents,
    pub stock: i64,
    pub version: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub image: Option<String>,
    /// A product is purchasable only once this is set and not in the future.
    pub published_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  TranslationSnapshot  -------------------------------------------------------
/// One language entry of a product's translation set.
///
/// Snapshotted verbatim into order items at checkout time, so the audit record of a sale is immune to later
/// catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TranslationSnapshot {
    pub lang: String,
    pub name: String,
    pub description: Option<String>,
}

//--------------------------------------      CartItem        --------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub sku_id: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      CartLine        --------------------------------------------------------
/// A cart item joined with its SKU and product, as read inside the checkout transaction.
///
/// Everything the validation steps and the order-item snapshot need is captured here, so the checkout never has
/// to re-read catalog rows after the stock check.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub cart_item_id: i64,
    pub user_id: i64,
    pub quantity: i64,
    pub sku_id: i64,
    pub sku_version: i64,
    pub sku_stock: i64,
    pub unit_price: Cents,
    pub variant: String,
    pub product_id: i64,
    pub seller_id: i64,
    pub product_name: String,
    pub product_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub product_deleted_at: Option<DateTime<Utc>>,
}

impl CartLine {
    pub fn subtotal(&self) -> Cents {
        self.unit_price * self.quantity
    }

    /// A product is available if it has not been soft-deleted and its publish timestamp has passed.
    pub fn product_available(&self, now: DateTime<Utc>) -> bool {
        self.product_deleted_at.is_none() && self.published_at.map(|at| at <= now).unwrap_or(false)
    }
}

//--------------------------------------    ReceiverInfo      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
}

//--------------------------------------        Order         --------------------------------------------------------
/// One order per seller per checkout request. Immutable once created except for status transitions.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub payment_id: i64,
    pub status: OrderStatusType,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn receiver(&self) -> ReceiverInfo {
        ReceiverInfo {
            name: self.receiver_name.clone(),
            phone: self.receiver_phone.clone(),
            address: self.receiver_address.clone(),
        }
    }
}

//--------------------------------------      OrderItem       --------------------------------------------------------
/// Write-once snapshot of what was actually sold.
///
/// All fields other than `sku_id` are copied by value at order-creation time and never re-derived from the live
/// catalog. `sku_id` is nullable so the audit record survives SKU deletion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub sku_id: Option<i64>,
    pub product_name: String,
    pub unit_price: Cents,
    pub image: Option<String>,
    pub variant: String,
    pub quantity: i64,
    /// JSON-encoded array of [`TranslationSnapshot`]s.
    pub translations: String,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn subtotal(&self) -> Cents {
        self.unit_price * self.quantity
    }

    pub fn translation_set(&self) -> Vec<TranslationSnapshot> {
        serde_json::from_str(&self.translations).unwrap_or_else(|e| {
            error!("Order item {} carries an unreadable translation snapshot: {e}", self.id);
            Vec::new()
        })
    }
}

//--------------------------------------       Payment        --------------------------------------------------------
/// One payment may aggregate orders from multiple sellers created in the same checkout call.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub status: PaymentStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  PaymentTransaction  --------------------------------------------------------
/// The recorded gateway transfer. Write-once; `tx_id` is the gateway's identifier and the natural idempotency
/// key — a duplicate is rejected, never overwritten.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub tx_id: String,
    pub gateway_code: Option<String>,
    pub amount: Cents,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    /// The transaction identifier assigned by the upstream gateway.
    pub tx_id: String,
    pub gateway_code: Option<String>,
    /// The free-text reference carrying the embedded payment id.
    pub reference: String,
    pub amount: Cents,
}

impl NewPaymentTransaction {
    pub fn new(tx_id: String, reference: String, amount: Cents) -> Self {
        Self { tx_id, gateway_code: None, reference, amount }
    }

    pub fn with_gateway_code(mut self, code: String) -> Self {
        self.gateway_code = Some(code);
        self
    }
}

//--------------------------------------     DelayedJob       --------------------------------------------------------
/// A scheduled compensating cancellation. `job_id` is derived from the payment id, so at most one pending job
/// exists per payment at any time.
#[derive(Debug, Clone, FromRow)]
pub struct DelayedJob {
    pub job_id: String,
    pub payment_id: i64,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DelayedJob {
    pub fn job_id_for_payment(payment_id: i64) -> String {
        format!("cancel-payment-{payment_id}")
    }
}
