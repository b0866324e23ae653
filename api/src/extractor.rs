use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use kernel::model::{auth::AccessToken, id::StaffId, role::Role, staff::Staff};
use registry::AppRegistry;
use shared::error::AppError;

// リクエストの前処理を実行後、handler に渡す構造体を定義。
// 管理系のエンドポイントは必ずこのエクストラクタを通し、
// 操作したスタッフを監査ログに残せるようにする
pub struct AuthorizedStaff {
    pub access_token: AccessToken,
    pub staff: Staff,
}

impl AuthorizedStaff {
    pub fn id(&self) -> StaffId {
        self.staff.staff_id
    }

    pub fn is_admin(&self) -> bool {
        self.staff.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedStaff {
    type Rejection = AppError;

    // handler メソッドの引数に AuthorizedStaff を追加したときはこのメソッドが呼ばれる
    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        // HTTP ヘッダからアクセストークンを取り出す
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::UnauthorizedError)?;
        let access_token = AccessToken(bearer.token().to_string());

        // アクセストークンが紐づくスタッフ ID を抽出
        let staff_id = registry
            .auth_repository()
            .fetch_staff_id_from_token(&access_token)
            .await?
            .ok_or(AppError::UnauthenticatedError)?;

        // スタッフ ID でデータベースからスタッフのレコードを引く
        let staff = registry
            .staff_repository()
            .find_current_staff(staff_id)
            .await?
            .ok_or(AppError::UnauthenticatedError)?;

        Ok(Self {
            access_token,
            staff,
        })
    }
}
