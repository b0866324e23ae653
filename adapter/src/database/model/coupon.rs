use kernel::model::{
    coupon::{Coupon, DiscountType},
    id::CouponId,
    resource::ResourceType,
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct CouponRow {
    pub coupon_id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub applies_to_all: bool,
    pub applicable_resource_types: Vec<ResourceType>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub min_total: Option<i64>,
    pub max_uses_total: Option<i64>,
    pub use_per_email: bool,
    pub is_active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(value: CouponRow) -> Self {
        let CouponRow {
            coupon_id,
            code,
            discount_type,
            value,
            applies_to_all,
            applicable_resource_types,
            valid_from,
            valid_to,
            min_total,
            max_uses_total,
            use_per_email,
            is_active,
        } = value;
        Coupon {
            coupon_id,
            code,
            discount_type,
            value,
            applies_to_all,
            applicable_resource_types,
            valid_from,
            valid_to,
            min_total,
            max_uses_total,
            use_per_email,
            is_active,
        }
    }
}

// メールアドレス割当の消費状況を見るための行
#[derive(sqlx::FromRow)]
pub struct EmailAssignmentRow {
    pub used_at: Option<DateTime<Utc>>,
}
