use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::admin::{
    cancel_order, mark_order_paid, register_manual_order, show_order, show_order_audit_logs,
    show_order_list,
};

pub fn build_admin_routers() -> Router<AppRegistry> {
    let admin_order_routers = Router::new()
        .route("/", post(register_manual_order))
        .route("/", get(show_order_list))
        .route("/:order_id", get(show_order))
        .route("/:order_id/cancel", post(cancel_order))
        .route("/:order_id/mark-paid", post(mark_order_paid))
        .route("/:order_id/audit-logs", get(show_order_audit_logs));

    Router::new().nest("/admin/orders", admin_order_routers)
}
