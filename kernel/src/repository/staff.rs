use crate::model::{id::StaffId, staff::Staff};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn find_current_staff(&self, staff_id: StaffId) -> AppResult<Option<Staff>>;
}
