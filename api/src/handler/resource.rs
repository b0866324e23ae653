use crate::{
    extractor::AuthorizedStaff,
    model::resource::{CreateResourceRequest, ResourceListQuery, ResourcesResponse},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// 予約対象になる稼働中の設備一覧
pub async fn show_resource_list(
    Query(query): Query<ResourceListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ResourcesResponse>> {
    registry
        .resource_repository()
        .find_active(query.resource_type)
        .await
        .map(ResourcesResponse::from)
        .map(Json)
}

pub async fn register_resource(
    staff: AuthorizedStaff,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateResourceRequest>,
) -> AppResult<StatusCode> {
    if !staff.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    registry
        .resource_repository()
        .create(req.into())
        .await
        .map(|_| StatusCode::CREATED)
}
