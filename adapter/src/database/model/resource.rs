use kernel::model::{
    id::ResourceId,
    resource::{Resource, ResourceType},
};

#[derive(sqlx::FromRow)]
pub struct ResourceRow {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub capacity: i32,
    pub price_override: Option<i64>,
    pub is_active: bool,
}

impl From<ResourceRow> for Resource {
    fn from(value: ResourceRow) -> Self {
        let ResourceRow {
            resource_id,
            resource_name,
            resource_type,
            capacity,
            price_override,
            is_active,
        } = value;
        Resource {
            resource_id,
            resource_name,
            resource_type,
            capacity,
            price_override,
            is_active,
        }
    }
}
