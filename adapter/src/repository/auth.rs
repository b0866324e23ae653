use crate::{
    database::{
        model::auth::{AuthorizationKey, AuthorizedStaffId},
        ConnectionPool,
    },
    redis::RedisClient,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        auth::{event::CreateToken, AccessToken},
        id::StaffId,
    },
    repository::auth::AuthRepository,
};
use shared::error::{AppError, AppResult};
use std::sync::Arc;

#[derive(new)]
pub struct AuthRepositoryImpl {
    db: ConnectionPool,
    kv: Arc<RedisClient>,
    ttl: u64,
}

#[derive(sqlx::FromRow)]
struct StaffCredentialRow {
    staff_id: StaffId,
    password_hash: String,
}

#[async_trait]
impl AuthRepository for AuthRepositoryImpl {
    async fn fetch_staff_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<StaffId>> {
        let key: AuthorizationKey = access_token.into();
        self.kv
            .get(&key)
            .await
            .map(|x| x.map(AuthorizedStaffId::into_inner))
    }

    async fn verify_staff(&self, email: &str, password: &str) -> AppResult<StaffId> {
        let staff_row: Option<StaffCredentialRow> = sqlx::query_as(
            r#"
                SELECT staff_id, password_hash
                FROM staff_accounts
                WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(staff_row) = staff_row else {
            return Err(AppError::UnauthenticatedError);
        };

        let valid = bcrypt::verify(password, &staff_row.password_hash)?;
        if !valid {
            return Err(AppError::UnauthenticatedError);
        }

        Ok(staff_row.staff_id)
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        let staff_id = self.verify_staff(&event.email, &event.password).await?;
        let key = AuthorizationKey::gen();
        self.kv
            .set_ex(&key, &AuthorizedStaffId::new(staff_id), self.ttl)
            .await?;
        Ok(key.into())
    }

    async fn delete_token(&self, access_token: &AccessToken) -> AppResult<()> {
        let key: AuthorizationKey = access_token.into();
        self.kv.delete(&key).await
    }
}
