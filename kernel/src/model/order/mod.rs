use crate::model::id::{OrderId, OrderItemId, ResourceId, StaffId};
use crate::model::slot::ReservedSlot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

pub mod event;

// 注文のライフサイクル。PAID / EXPIRED / CANCELLED が終端状態で、
// 例外として PAID からの CANCELLED（返金フロー）だけは許す
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Hold,
    PendingPayment,
    PendingOnsite,
    Paid,
    Expired,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Expired | OrderStatus::Cancelled
        )
    }

    // 期限切れ掃き出しの対象になる状態
    pub fn sweep_eligible(self) -> bool {
        matches!(self, OrderStatus::Hold | OrderStatus::PendingPayment)
    }

    // 遷移表。ここを通らない状態変更は存在しない
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Hold, PendingPayment)
                | (Hold, PendingOnsite)
                | (Hold, Expired)
                | (Hold, Cancelled)
                | (PendingPayment, Paid)
                | (PendingPayment, Expired)
                | (PendingPayment, Cancelled)
                | (PendingOnsite, Paid)
                | (PendingOnsite, Cancelled)
                | (Paid, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Online,
    OnSiteCash,
}

impl PaymentMethod {
    pub fn requires_online_payment(self) -> bool {
        matches!(self, PaymentMethod::Online)
    }
}

// 明細行の課金方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, sqlx::Type)]
#[sqlx(type_name = "pricing_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    PerResourcePerHour,
    PerPersonPerHour,
    PerPersonPerSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

#[derive(Debug)]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub customer: Customer,
    pub coupon_code: Option<String>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub payment_session_id: Option<String>,
    // スタッフが手動起票した場合の起票者
    pub created_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub slots: Vec<ReservedSlot>,
}

#[derive(Debug)]
pub struct OrderItem {
    pub order_item_id: OrderItemId,
    pub resource_id: ResourceId,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    pub people_count: Option<i32>,
    pub unit_amount: i64,
    pub total_amount: i64,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Hold, PendingPayment, true)]
    #[case(Hold, PendingOnsite, true)]
    #[case(Hold, Paid, false)] // 決済フローを経ずに PAID にはならない
    #[case(PendingPayment, Paid, true)]
    #[case(PendingPayment, Expired, true)]
    #[case(PendingOnsite, Paid, true)]
    #[case(PendingOnsite, Expired, false)] // 現地決済に期限切れはない
    #[case(Paid, Cancelled, true)] // 返金フロー
    #[case(Paid, Expired, false)]
    #[case(Expired, Paid, false)] // 放棄済みホールドへの遅延決済は拒否
    #[case(Cancelled, Paid, false)]
    fn test_order_status_transitions(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_terminal_and_sweep_eligibility() {
        assert!(Paid.is_terminal());
        assert!(Expired.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!PendingOnsite.is_terminal());

        assert!(Hold.sweep_eligible());
        assert!(PendingPayment.sweep_eligible());
        // 現地決済待ちはスイーパーの対象外
        assert!(!PendingOnsite.sweep_eligible());
        assert!(!Paid.sweep_eligible());
    }
}
