use crate::database::{
    model::coupon::{CouponRow, EmailAssignmentRow},
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    coupon::{Coupon, CouponUsage, EmailAssignment},
    id::CouponId,
};
use kernel::repository::coupon::CouponRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct CouponRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl CouponRepository for CouponRepositoryImpl {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Coupon>> {
        let row: Option<CouponRow> = sqlx::query_as(
            r#"
                SELECT coupon_id, code, discount_type, value, applies_to_all,
                       applicable_resource_types, valid_from, valid_to,
                       min_total, max_uses_total, use_per_email, is_active
                FROM coupons
                WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Coupon::from))
    }

    // 検証用スナップショットの読み取り。ここでは何も書き込まない。
    // 検証を何度呼んでも利用回数が減らないことはこの分離で保証される
    async fn usage_for(&self, coupon_id: CouponId, email: &str) -> AppResult<CouponUsage> {
        let (redemption_count,): (i64,) = sqlx::query_as(
            r#"
                SELECT COUNT(*)
                FROM coupon_redemptions
                WHERE coupon_id = $1
            "#,
        )
        .bind(coupon_id)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let assignment: Option<EmailAssignmentRow> = sqlx::query_as(
            r#"
                SELECT used_at
                FROM coupon_email_assignments
                WHERE coupon_id = $1 AND email = $2
            "#,
        )
        .bind(coupon_id)
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let (email_already_redeemed,): (bool,) = sqlx::query_as(
            r#"
                SELECT EXISTS (
                    SELECT 1
                    FROM coupon_redemptions
                    WHERE coupon_id = $1 AND email = $2
                )
            "#,
        )
        .bind(coupon_id)
        .bind(email)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(CouponUsage {
            redemption_count,
            email_assignment: assignment.map(|row| EmailAssignment {
                used: row.used_at.is_some(),
            }),
            email_already_redeemed,
        })
    }
}
