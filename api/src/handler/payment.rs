use crate::model::payment::{
    CheckoutRequest, CheckoutResponse, PaymentStatusResponse, PaymentWebhookRequest,
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
use kernel::model::order::event::{MarkPaid, StartCheckout};
use kernel::payment::PaymentStatus;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// 外部決済へのチェックアウト開始。注文は PENDING_PAYMENT へ進む
pub async fn checkout(
    State(registry): State<AppRegistry>,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutResponse>> {
    req.validate(&())?;

    let order = registry.order_repository().find_by_id(req.order_id).await?;
    if !order.payment_method.requires_online_payment() {
        return Err(AppError::UnprocessableEntity(format!(
            "注文（{}）はオンライン決済の注文ではありません",
            order.order_id
        )));
    }

    let session = registry
        .payment_gateway()
        .initiate_checkout(order.order_id, order.total_amount)
        .await?;

    registry
        .order_repository()
        .start_checkout(StartCheckout::new(
            order.order_id,
            session.session_id.clone(),
            Actor::Customer,
        ))
        .await?;

    Ok(Json(CheckoutResponse {
        order_id: order.order_id,
        session_id: session.session_id,
        redirect_url: session.redirect_url,
    }))
}

// 決済プロバイダからの非同期通知。通知内容は信用せず照会し直す
pub async fn payment_webhook(
    State(registry): State<AppRegistry>,
    Json(req): Json<PaymentWebhookRequest>,
) -> AppResult<StatusCode> {
    req.validate(&())?;

    confirm_session(&registry, &req.session_id).await?;
    Ok(StatusCode::OK)
}

// ブラウザのリダイレクト戻りで使うポーリング口
pub async fn payment_status(
    Path(session_id): Path<String>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaymentStatusResponse>> {
    let (order_id, status) = confirm_session(&registry, &session_id).await?;
    Ok(Json(PaymentStatusResponse {
        order_id,
        session_id,
        status: status.as_ref().to_string(),
    }))
}

// 決済状態をプロバイダに照会し、PAID なら注文の確定遷移を駆動する。
// 放棄済みホールド（EXPIRED）への遅延確定はリポジトリ側の
// 状態ガードで StaleTransition として拒否される
async fn confirm_session(
    registry: &AppRegistry,
    session_id: &str,
) -> AppResult<(OrderId, PaymentStatus)> {
    let order_id = registry
        .order_repository()
        .find_by_payment_session(session_id)
        .await?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!(
                "決済セッション（{session_id}）に対応する注文が見つかりませんでした。"
            ))
        })?;

    let status = registry.payment_gateway().fetch_status(session_id).await?;

    if status == PaymentStatus::Paid {
        registry
            .order_repository()
            .mark_paid(MarkPaid::new(order_id, Actor::PaymentWebhook, Utc::now()))
            .await?;
    }

    Ok((order_id, status))
}
