use crate::model::id::OrderId;
use async_trait::async_trait;
use shared::error::AppResult;
use strum::{AsRefStr, EnumString};

// 外部決済プロバイダへの出口。ワイヤプロトコルはアダプタ側の関心事で、
// コアはこのポート越しにしか決済を知らない
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

#[mockall::automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    // 決済セッションを開始し、リダイレクト先を得る
    async fn initiate_checkout(&self, order_id: OrderId, amount: i64)
        -> AppResult<CheckoutSession>;
    // セッションの決済状態を照会する
    async fn fetch_status(&self, session_id: &str) -> AppResult<PaymentStatus>;
}
