use crate::model::{
    id::OrderId,
    order::{
        event::{CancelOrder, CreateHold, HoldCreated, MarkPaid, StartCheckout},
        Order,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    // ホールド作成操作。要求された全時間帯を単一のトランザクションで
    // 衝突チェックし、1 枠でも確保できなければ全体を失敗させる
    async fn create_hold(&self, event: CreateHold, now: DateTime<Utc>) -> AppResult<HoldCreated>;

    // 決済セッションを紐付けて PENDING_PAYMENT へ進める
    async fn start_checkout(&self, event: StartCheckout) -> AppResult<()>;

    // PAID 遷移。スロットの BOOKED 化・クーポン償還・監査ログまでを
    // 同一トランザクションで行う
    async fn mark_paid(&self, event: MarkPaid) -> AppResult<()>;

    // キャンセル遷移。決済後のキャンセル（返金フロー）も受け付ける
    async fn cancel(&self, event: CancelOrder) -> AppResult<()>;

    // 期限切れホールドの掃き出し。解放した注文数を返す
    async fn sweep_expired_holds(&self, now: DateTime<Utc>) -> AppResult<usize>;

    async fn find_by_id(&self, order_id: OrderId) -> AppResult<Order>;

    async fn find_by_payment_session(&self, session_id: &str) -> AppResult<Option<OrderId>>;

    async fn find_all(&self) -> AppResult<Vec<Order>>;
}
