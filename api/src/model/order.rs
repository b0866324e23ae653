use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    id::{OrderId, OrderItemId, ResourceId, SlotId},
    order::{
        event::HoldCreated, Customer, Order, OrderItem, OrderStatus, PaymentMethod, PricingMode,
    },
    slot::{ReservedSlot, SlotStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldRequest {
    #[garde(length(min = 1), dive)]
    pub items: Vec<HoldItemRequest>,
    #[garde(dive)]
    pub customer: CustomerRequest,
    #[garde(skip)]
    pub coupon_code: Option<String>,
    #[garde(skip)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HoldItemRequest {
    #[garde(skip)]
    pub resource_id: ResourceId,
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    // 細かい範囲の妥当性は設備種別ごとのポリシーで検証する
    #[garde(range(min = 1))]
    pub duration_minutes: u32,
    #[garde(skip)]
    pub people_count: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub phone: String,
}

impl From<CustomerRequest> for Customer {
    fn from(value: CustomerRequest) -> Self {
        let CustomerRequest { name, email, phone } = value;
        Customer {
            customer_name: name,
            customer_email: email,
            customer_phone: phone,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldCreatedResponse {
    pub order_id: OrderId,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub reserved_slots: Vec<ReservedSlotResponse>,
    pub requires_online_payment: bool,
}

impl From<HoldCreated> for HoldCreatedResponse {
    fn from(value: HoldCreated) -> Self {
        let HoldCreated {
            order_id,
            hold_expires_at,
            total_amount,
            discount_amount,
            reserved_slots,
            requires_online_payment,
        } = value;
        Self {
            order_id,
            hold_expires_at,
            total_amount,
            discount_amount,
            reserved_slots: reserved_slots
                .into_iter()
                .map(ReservedSlotResponse::from)
                .collect(),
            requires_online_payment,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedSlotResponse {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
}

impl From<ReservedSlot> for ReservedSlotResponse {
    fn from(value: ReservedSlot) -> Self {
        let ReservedSlot {
            slot_id,
            resource_id,
            order_id: _,
            start_time,
            end_time,
            status,
            expires_at: _,
        } = value;
        Self {
            slot_id,
            resource_id,
            start_time,
            end_time,
            status,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[garde(length(min = 1))]
    pub reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersResponse {
    pub items: Vec<OrderResponse>,
}

impl From<Vec<Order>> for OrdersResponse {
    fn from(value: Vec<Order>) -> Self {
        Self {
            items: value.into_iter().map(OrderResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub coupon_code: Option<String>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    pub reserved_slots: Vec<ReservedSlotResponse>,
}

impl From<Order> for OrderResponse {
    fn from(value: Order) -> Self {
        let Order {
            order_id,
            status,
            payment_method,
            total_amount,
            discount_amount,
            customer:
                Customer {
                    customer_name,
                    customer_email,
                    customer_phone,
                },
            coupon_code,
            hold_expires_at,
            paid_at,
            cancelled_at,
            payment_session_id: _,
            created_by: _,
            created_at,
            items,
            slots,
        } = value;
        Self {
            order_id,
            status,
            payment_method,
            total_amount,
            discount_amount,
            customer_name,
            customer_email,
            customer_phone,
            coupon_code,
            hold_expires_at,
            paid_at,
            cancelled_at,
            created_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            reserved_slots: slots.into_iter().map(ReservedSlotResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub order_item_id: OrderItemId,
    pub resource_id: ResourceId,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    pub people_count: Option<i32>,
    pub unit_amount: i64,
    pub total_amount: i64,
    pub description: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(value: OrderItem) -> Self {
        let OrderItem {
            order_item_id,
            resource_id,
            pricing_mode,
            quantity,
            people_count,
            unit_amount,
            total_amount,
            description,
        } = value;
        Self {
            order_item_id,
            resource_id,
            pricing_mode,
            quantity,
            people_count,
            unit_amount,
            total_amount,
            description,
        }
    }
}
