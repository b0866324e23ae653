use crate::database::{model::resource::ResourceRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::ResourceId,
    resource::{event::CreateResource, Resource, ResourceType},
};
use kernel::repository::resource::ResourceRepository;
use shared::error::{AppError, AppResult};
use uuid::Uuid;

#[derive(new)]
pub struct ResourceRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ResourceRepository for ResourceRepositoryImpl {
    async fn create(&self, event: CreateResource) -> AppResult<ResourceId> {
        let resource_id = ResourceId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO resources
                (resource_id, resource_name, resource_type, capacity, price_override, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(resource_id)
        .bind(&event.resource_name)
        .bind(event.resource_type)
        .bind(event.capacity)
        .bind(event.price_override)
        .bind(event.is_active)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No resource record has been created".into(),
            ));
        }

        Ok(resource_id)
    }

    async fn find_active(&self, resource_type: Option<ResourceType>) -> AppResult<Vec<Resource>> {
        let rows: Vec<ResourceRow> = match resource_type {
            Some(resource_type) => {
                sqlx::query_as(
                    r#"
                        SELECT resource_id, resource_name, resource_type,
                               capacity, price_override, is_active
                        FROM resources
                        WHERE is_active AND resource_type = $1
                        ORDER BY resource_name ASC
                    "#,
                )
                .bind(resource_type)
                .fetch_all(self.db.inner_ref())
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                        SELECT resource_id, resource_name, resource_type,
                               capacity, price_override, is_active
                        FROM resources
                        WHERE is_active
                        ORDER BY resource_name ASC
                    "#,
                )
                .fetch_all(self.db.inner_ref())
                .await
            }
        }
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Resource::from).collect())
    }

    async fn find_by_id(&self, resource_id: ResourceId) -> AppResult<Option<Resource>> {
        let row: Option<ResourceRow> = sqlx::query_as(
            r#"
                SELECT resource_id, resource_name, resource_type,
                       capacity, price_override, is_active
                FROM resources
                WHERE resource_id = $1
            "#,
        )
        .bind(resource_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Resource::from))
    }

    async fn find_by_ids(&self, resource_ids: &[ResourceId]) -> AppResult<Vec<Resource>> {
        let raw_ids: Vec<Uuid> = resource_ids.iter().map(|id| id.raw()).collect();
        let rows: Vec<ResourceRow> = sqlx::query_as(
            r#"
                SELECT resource_id, resource_name, resource_type,
                       capacity, price_override, is_active
                FROM resources
                WHERE resource_id = ANY($1)
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Resource::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../migrations")]
    async fn test_register_and_find_resource(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = ResourceRepositoryImpl::new(ConnectionPool::new(pool));

        let event = CreateResource {
            resource_name: "レーン9".into(),
            resource_type: ResourceType::BowlingLane,
            capacity: 6,
            price_override: Some(2800),
            is_active: true,
        };

        let resource_id = repo.create(event).await?;

        let found = repo.find_by_id(resource_id).await?;
        assert!(found.is_some());
        let resource = found.unwrap();
        assert_eq!(resource.resource_name, "レーン9");
        assert_eq!(resource.resource_type, ResourceType::BowlingLane);
        assert_eq!(resource.price_override, Some(2800));

        let lanes = repo.find_active(Some(ResourceType::BowlingLane)).await?;
        assert!(lanes.iter().any(|r| r.resource_id == resource_id));

        let karaoke = repo.find_active(Some(ResourceType::KaraokeRoom)).await?;
        assert!(karaoke.iter().all(|r| r.resource_id != resource_id));

        Ok(())
    }
}
