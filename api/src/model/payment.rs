use garde::Validate;
use kernel::model::id::OrderId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[garde(skip)]
    pub order_id: OrderId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub session_id: String,
    pub redirect_url: String,
}

// 決済プロバイダからの通知。状態はここに載っている値を鵜呑みにせず、
// 必ずプロバイダへ照会し直した結果で遷移を駆動する
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookRequest {
    #[garde(length(min = 1))]
    pub session_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub order_id: OrderId,
    pub session_id: String,
    pub status: String,
}
