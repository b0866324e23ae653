use crate::model::{
    id::ResourceId,
    resource::{event::CreateResource, Resource, ResourceType},
};
use async_trait::async_trait;
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn create(&self, event: CreateResource) -> AppResult<ResourceId>;
    // 稼働中の設備一覧。種別の絞り込みは任意
    async fn find_active(&self, resource_type: Option<ResourceType>) -> AppResult<Vec<Resource>>;
    async fn find_by_id(&self, resource_id: ResourceId) -> AppResult<Option<Resource>>;
    async fn find_by_ids(&self, resource_ids: &[ResourceId]) -> AppResult<Vec<Resource>>;
}
