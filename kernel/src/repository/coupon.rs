use crate::model::coupon::{Coupon, CouponUsage};
use crate::model::id::CouponId;
use async_trait::async_trait;
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Coupon>>;

    // 検証用の利用状況スナップショットを読み取る。副作用なし。
    // 償還の記録は注文リポジトリの PAID 遷移内で行われる
    async fn usage_for(&self, coupon_id: CouponId, email: &str) -> AppResult<CouponUsage>;
}
