use crate::model::{
    auth::{event::CreateToken, AccessToken},
    id::StaffId,
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait AuthRepository: Send + Sync {
    // アクセストークンからスタッフ ID を引く
    async fn fetch_staff_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<StaffId>>;

    async fn verify_staff(&self, email: &str, password: &str) -> AppResult<StaffId>;

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken>;

    async fn delete_token(&self, access_token: &AccessToken) -> AppResult<()>;
}
