use crate::model::resource::ResourceType;

pub struct CreateResource {
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub capacity: i32,
    pub price_override: Option<i64>,
    pub is_active: bool,
}
