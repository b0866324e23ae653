use crate::model::id::{AuditLogId, StaffId};
use chrono::{DateTime, Utc};
use strum::{AsRefStr, EnumString};

// 状態を変えるすべての遷移で監査ログを残す。
// システム起点の遷移（スイーパー・決済 Webhook）も例外にしない
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    HoldCreated,
    CheckoutStarted,
    Paid,
    Cancelled,
    Expired,
}

// 監査ログに記録する操作主体
#[derive(Debug, Clone)]
pub enum Actor {
    Staff(StaffId),
    Customer,
    ExpirySweeper,
    PaymentWebhook,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Staff(staff_id) => write!(f, "staff:{staff_id}"),
            Actor::Customer => write!(f, "customer"),
            Actor::ExpirySweeper => write!(f, "system:expiry-sweeper"),
            Actor::PaymentWebhook => write!(f, "system:payment-webhook"),
        }
    }
}

pub struct NewAuditLog {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub actor: String,
    pub reason: Option<String>,
}

pub struct AuditLog {
    pub audit_log_id: AuditLogId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
