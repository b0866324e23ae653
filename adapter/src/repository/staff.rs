use crate::database::{model::staff::StaffRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{id::StaffId, staff::Staff},
    repository::staff::StaffRepository,
};
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct StaffRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl StaffRepository for StaffRepositoryImpl {
    async fn find_current_staff(&self, staff_id: StaffId) -> AppResult<Option<Staff>> {
        let row: Option<StaffRow> = sqlx::query_as(
            r#"
                SELECT staff_id, staff_name, email, role
                FROM staff_accounts
                WHERE staff_id = $1
            "#,
        )
        .bind(staff_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Staff::from))
    }
}
