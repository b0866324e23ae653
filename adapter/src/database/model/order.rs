use kernel::model::{
    id::{OrderId, OrderItemId, ResourceId, StaffId},
    order::{Customer, Order, OrderItem, OrderStatus, PaymentMethod, PricingMode},
    slot::ReservedSlot,
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct OrderRow {
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
    pub payment_session_id: Option<String>,
    pub created_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
}

// From トレイトの実装の代わりに、明細とスロットを引数にとる
// into_order メソッドを定義し実装する
impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItem>, slots: Vec<ReservedSlot>) -> Order {
        let OrderRow {
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
            payment_session_id,
            created_by,
            created_at,
        } = self;
        Order {
            order_id,
            status,
            payment_method,
            total_amount,
            discount_amount,
            customer: Customer {
                customer_name,
                customer_email,
                customer_phone,
            },
            coupon_code,
            hold_expires_at,
            paid_at,
            cancelled_at,
            payment_session_id,
            created_by,
            created_at,
            items,
            slots,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct OrderItemRow {
    pub order_item_id: OrderItemId,
    pub order_id: OrderId,
    pub resource_id: ResourceId,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    pub people_count: Option<i32>,
    pub unit_amount: i64,
    pub total_amount: i64,
    pub description: String,
}

impl From<OrderItemRow> for OrderItem {
    fn from(value: OrderItemRow) -> Self {
        let OrderItemRow {
            order_item_id,
            order_id: _,
            resource_id,
            pricing_mode,
            quantity,
            people_count,
            unit_amount,
            total_amount,
            description,
        } = value;
        OrderItem {
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

// 状態遷移のガードに使う最小限の行
#[derive(sqlx::FromRow)]
pub struct OrderStateRow {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub coupon_code: Option<String>,
    pub customer_email: String,
    pub hold_expires_at: Option<DateTime<Utc>>,
}
