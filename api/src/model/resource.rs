use garde::Validate;
use kernel::model::{
    id::ResourceId,
    resource::{event::CreateResource, Resource, ResourceType},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    #[garde(length(min = 1))]
    pub resource_name: String,
    #[garde(skip)]
    pub resource_type: ResourceType,
    #[garde(range(min = 1))]
    pub capacity: i32,
    #[garde(range(min = 0))]
    pub price_override: Option<i64>,
    #[garde(skip)]
    pub is_active: bool,
}

impl From<CreateResourceRequest> for CreateResource {
    fn from(value: CreateResourceRequest) -> Self {
        let CreateResourceRequest {
            resource_name,
            resource_type,
            capacity,
            price_override,
            is_active,
        } = value;
        CreateResource {
            resource_name,
            resource_type,
            capacity,
            price_override,
            is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListQuery {
    pub resource_type: Option<ResourceType>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesResponse {
    pub items: Vec<ResourceResponse>,
}

impl From<Vec<Resource>> for ResourcesResponse {
    fn from(value: Vec<Resource>) -> Self {
        Self {
            items: value.into_iter().map(ResourceResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResponse {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub capacity: i32,
    pub is_active: bool,
}

impl From<Resource> for ResourceResponse {
    fn from(value: Resource) -> Self {
        let Resource {
            resource_id,
            resource_name,
            resource_type,
            capacity,
            price_override: _,
            is_active,
        } = value;
        Self {
            resource_id,
            resource_name,
            resource_type,
            capacity,
            is_active,
        }
    }
}
