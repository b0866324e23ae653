use async_trait::async_trait;
use kernel::model::id::OrderId;
use kernel::payment::{CheckoutSession, PaymentGateway, PaymentStatus};
use reqwest::Client;
use serde::Deserialize;
use shared::config::PaymentConfig;
use shared::error::{AppError, AppResult};
use std::str::FromStr;

// 外部決済プロバイダの HTTP アダプタ。
// コア側はこの実装の先のワイヤプロトコルを知らない
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionResponse {
    session_id: String,
    redirect_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusResponse {
    status: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate_checkout(
        &self,
        order_id: OrderId,
        amount: i64,
    ) -> AppResult<CheckoutSession> {
        let url = format!("{}/sessions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "orderId": order_id.to_string(),
                "amount": amount,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("決済セッションの開始に失敗しました: {e}")))?;

        if !res.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "決済プロバイダがエラーを返しました: {}",
                res.status()
            )));
        }

        let body: CheckoutSessionResponse = res
            .json()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("決済プロバイダ応答の解析に失敗しました: {e}")))?;

        Ok(CheckoutSession {
            session_id: body.session_id,
            redirect_url: body.redirect_url,
        })
    }

    async fn fetch_status(&self, session_id: &str) -> AppResult<PaymentStatus> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("決済状態の照会に失敗しました: {e}")))?;

        if !res.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "決済プロバイダがエラーを返しました: {}",
                res.status()
            )));
        }

        let body: SessionStatusResponse = res
            .json()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("決済プロバイダ応答の解析に失敗しました: {e}")))?;

        PaymentStatus::from_str(&body.status).map_err(|_| {
            AppError::ExternalServiceError(format!("未知の決済状態です: {}", body.status))
        })
    }
}
