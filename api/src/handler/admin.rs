use crate::{
    extractor::AuthorizedStaff,
    handler::order::build_create_hold,
    model::{
        audit::AuditLogsResponse,
        order::{CancelOrderRequest, CreateHoldRequest, HoldCreatedResponse, OrderResponse, OrdersResponse},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::audit::Actor;
use kernel::model::id::OrderId;
use kernel::model::order::event::{CancelOrder, MarkPaid};
use registry::AppRegistry;
use shared::error::AppResult;

// スタッフによる手動起票（電話・店頭受付）。
// フローは顧客のホールド作成と同じで、起票者だけが記録される
pub async fn register_manual_order(
    staff: AuthorizedStaff,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateHoldRequest>,
) -> AppResult<(StatusCode, Json<HoldCreatedResponse>)> {
    req.validate(&())?;

    let now = Utc::now();
    let resource_repository = registry.resource_repository();
    let coupon_repository = registry.coupon_repository();
    let event = build_create_hold(
        resource_repository.as_ref(),
        coupon_repository.as_ref(),
        &registry.booking_config(),
        req,
        now,
        Some(staff.id()),
    )
    .await?;

    let created = registry.order_repository().create_hold(event, now).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn cancel_order(
    staff: AuthorizedStaff,
    Path(order_id): Path<OrderId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<CancelOrderRequest>,
) -> AppResult<StatusCode> {
    req.validate(&())?;

    registry
        .order_repository()
        .cancel(CancelOrder::new(
            order_id,
            Actor::Staff(staff.id()),
            req.reason,
            Utc::now(),
        ))
        .await
        .map(|_| StatusCode::OK)
}

// 店頭での支払い確認。オンライン決済待ちの注文にも使える
pub async fn mark_order_paid(
    staff: AuthorizedStaff,
    Path(order_id): Path<OrderId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .order_repository()
        .mark_paid(MarkPaid::new(order_id, Actor::Staff(staff.id()), Utc::now()))
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_order_list(
    _staff: AuthorizedStaff,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<OrdersResponse>> {
    registry
        .order_repository()
        .find_all()
        .await
        .map(OrdersResponse::from)
        .map(Json)
}

pub async fn show_order(
    _staff: AuthorizedStaff,
    Path(order_id): Path<OrderId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<OrderResponse>> {
    registry
        .order_repository()
        .find_by_id(order_id)
        .await
        .map(OrderResponse::from)
        .map(Json)
}

// 紛争対応用の監査証跡
pub async fn show_order_audit_logs(
    _staff: AuthorizedStaff,
    Path(order_id): Path<OrderId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AuditLogsResponse>> {
    registry
        .audit_log_repository()
        .find_by_entity("order", &order_id.to_string())
        .await
        .map(AuditLogsResponse::from)
        .map(Json)
}
