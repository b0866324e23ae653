use crate::model::availability::{AvailabilityQuery, DayAvailabilityResponse};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use kernel::model::availability::build_day_availability;
use registry::AppRegistry;
use shared::error::AppResult;

// 指定日の空き状況を返す。休業日は空のリソース一覧になる。
// 期限切れホールドはスイーパー未実行でも空きとして報告される
pub async fn get_availability(
    Query(query): Query<AvailabilityQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<DayAvailabilityResponse>> {
    let config = registry.booking_config();
    let now = Utc::now();
    let hours = config.hours.day_hours(query.date);

    let resources = registry
        .resource_repository()
        .find_active(query.resource_type)
        .await?;

    let slots = match hours {
        Some((open, close)) => {
            let day_open = query.date.and_time(open).and_utc();
            let day_close = query.date.and_time(close).and_utc();
            registry
                .slot_repository()
                .find_blocking_in_range(day_open, day_close)
                .await?
        }
        None => vec![],
    };

    let day = build_day_availability(
        query.date,
        &resources,
        &slots,
        hours,
        config.slot_interval_minutes,
        now,
    );

    Ok(Json(day.into()))
}
