use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    availability::get_availability,
    coupon::validate_coupon,
    order::create_hold,
    payment::{checkout, payment_status, payment_webhook},
    resource::{register_resource, show_resource_list},
};

// 顧客向けの予約フロー一式（空き照会 → ホールド → 決済）
pub fn build_booking_routers() -> Router<AppRegistry> {
    Router::new()
        .route("/availability", get(get_availability))
        .route("/resources", get(show_resource_list))
        .route("/resources", post(register_resource))
        .route("/hold", post(create_hold))
        .route("/checkout", post(checkout))
        .route("/payments/webhook", post(payment_webhook))
        .route("/payments/status/:session_id", get(payment_status))
        .route("/coupons/validate", post(validate_coupon))
}
