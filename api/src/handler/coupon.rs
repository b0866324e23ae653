use crate::model::coupon::{ValidateCouponRequest, ValidateCouponResponse};
use axum::{extract::State, Json};
use chrono::Utc;
use garde::Validate;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// クーポンの事前検証。何度呼んでも利用回数は消費されない
pub async fn validate_coupon(
    State(registry): State<AppRegistry>,
    Json(req): Json<ValidateCouponRequest>,
) -> AppResult<Json<ValidateCouponResponse>> {
    req.validate(&())?;

    let coupon = registry
        .coupon_repository()
        .find_by_code(&req.code)
        .await?
        .ok_or_else(|| AppError::CouponRejected("クーポンが見つかりません".into()))?;

    let usage = registry
        .coupon_repository()
        .usage_for(coupon.coupon_id, &req.email)
        .await?;

    let items: Vec<_> = req.items.into_iter().map(Into::into).collect();
    let result = coupon
        .validate(&usage, &items, Utc::now())
        .map_err(|reason| AppError::CouponRejected(reason.to_string()))?;

    Ok(Json(ValidateCouponResponse {
        ok: true,
        discount: result.discount,
        total_after: result.total_after,
    }))
}
