use chrono::{DateTime, NaiveDate, Utc};
use kernel::model::availability::{
    AvailabilitySlot, DayAvailability, ResourceAvailability, SlotAvailability,
};
use kernel::model::id::ResourceId;
use kernel::model::resource::ResourceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub resource_type: Option<ResourceType>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailabilityResponse {
    pub date: NaiveDate,
    pub resources: Vec<ResourceAvailabilityResponse>,
}

impl From<DayAvailability> for DayAvailabilityResponse {
    fn from(value: DayAvailability) -> Self {
        let DayAvailability { date, resources } = value;
        Self {
            date,
            resources: resources
                .into_iter()
                .map(ResourceAvailabilityResponse::from)
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAvailabilityResponse {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub slots: Vec<AvailabilitySlotResponse>,
}

impl From<ResourceAvailability> for ResourceAvailabilityResponse {
    fn from(value: ResourceAvailability) -> Self {
        let ResourceAvailability {
            resource_id,
            resource_name,
            resource_type,
            slots,
        } = value;
        Self {
            resource_id,
            resource_name,
            resource_type,
            slots: slots.into_iter().map(AvailabilitySlotResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlotResponse {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotAvailability,
}

impl From<AvailabilitySlot> for AvailabilitySlotResponse {
    fn from(value: AvailabilitySlot) -> Self {
        let AvailabilitySlot {
            start_time,
            end_time,
            status,
        } = value;
        Self {
            start_time,
            end_time,
            status,
        }
    }
}
