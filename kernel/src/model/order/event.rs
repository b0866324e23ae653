use crate::model::audit::Actor;
use crate::model::id::{OrderId, ResourceId, StaffId};
use crate::model::order::{Customer, PaymentMethod, PricingMode};
use crate::model::slot::ReservedSlot;
use chrono::{DateTime, Utc};
use derive_new::new;

// ホールド作成イベント。
// 金額・割引はハンドラ側で PricingEngine / CouponValidator を通して
// 計算済みであり、リポジトリは書き込みの原子性と衝突検出だけに責任を持つ
#[derive(Debug)]
pub struct CreateHold {
    pub items: Vec<HoldItem>,
    pub customer: Customer,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub discount_amount: i64,
    // オンライン決済の場合のみ設定。現地決済のホールドに期限は付けない
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub created_by: Option<StaffId>,
}

#[derive(Debug)]
pub struct HoldItem {
    pub resource_id: ResourceId,
    pub pricing_mode: PricingMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub quantity: i32,
    pub people_count: Option<i32>,
    pub unit_amount: i64,
    pub total_amount: i64,
    pub description: String,
}

// create_hold の結果
#[derive(Debug)]
pub struct HoldCreated {
    pub order_id: OrderId,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub reserved_slots: Vec<ReservedSlot>,
    pub requires_online_payment: bool,
}

#[derive(new)]
pub struct MarkPaid {
    pub order_id: OrderId,
    pub actor: Actor,
    pub paid_at: DateTime<Utc>,
}

#[derive(new)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub actor: Actor,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

// /checkout で決済セッションを紐付けて PENDING_PAYMENT へ進めるイベント
#[derive(new)]
pub struct StartCheckout {
    pub order_id: OrderId,
    pub payment_session_id: String,
    pub actor: Actor,
}
