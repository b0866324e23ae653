use garde::Validate;
use kernel::model::coupon::CouponItem;
use kernel::model::resource::ResourceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[garde(length(min = 1))]
    pub code: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1), dive)]
    pub items: Vec<CouponItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponItemRequest {
    #[garde(skip)]
    pub resource_type: ResourceType,
    #[garde(range(min = 0))]
    pub total_amount: i64,
}

impl From<CouponItemRequest> for CouponItem {
    fn from(value: CouponItemRequest) -> Self {
        let CouponItemRequest {
            resource_type,
            total_amount,
        } = value;
        CouponItem {
            resource_type,
            total_amount,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub ok: bool,
    pub discount: i64,
    pub total_after: i64,
}
