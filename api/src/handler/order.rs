use crate::model::order::{CreateHoldRequest, HoldCreatedResponse};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Duration, Utc};
use garde::Validate;
use kernel::model::availability::validate_booking_window;
use kernel::model::coupon::CouponItem;
use kernel::model::id::StaffId;
use kernel::model::order::{
    event::{CreateHold, HoldItem},
    PaymentMethod,
};
use kernel::pricing;
use kernel::repository::{coupon::CouponRepository, resource::ResourceRepository};
use registry::AppRegistry;
use shared::config::BookingConfig;
use shared::error::{AppError, AppResult};

// 顧客向けのホールド作成。衝突時は 409 が返り、呼び出し側は
// 空き状況を取り直して別の時間帯で再試行する
pub async fn create_hold(
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateHoldRequest>,
) -> AppResult<(StatusCode, Json<HoldCreatedResponse>)> {
    req.validate(&())?;

    let now = Utc::now();
    let resource_repository = registry.resource_repository();
    let coupon_repository = registry.coupon_repository();
    let event = build_create_hold(
        resource_repository.as_ref(),
        coupon_repository.as_ref(),
        &registry.booking_config(),
        req,
        now,
        None,
    )
    .await?;

    let created = registry.order_repository().create_hold(event, now).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

// リクエストを検証し、金額計算済みのホールド作成イベントへ組み立てる。
// ここを通過するまでは何も書き込まれない（ValidationError に副作用なし）
pub(crate) async fn build_create_hold(
    resource_repository: &dyn ResourceRepository,
    coupon_repository: &dyn CouponRepository,
    config: &BookingConfig,
    req: CreateHoldRequest,
    now: DateTime<Utc>,
    created_by: Option<StaffId>,
) -> AppResult<CreateHold> {
    let requested_ids: Vec<_> = req.items.iter().map(|item| item.resource_id).collect();
    let resources = resource_repository.find_by_ids(&requested_ids).await?;

    let mut items = Vec::with_capacity(req.items.len());
    let mut coupon_items = Vec::with_capacity(req.items.len());
    let mut subtotal: i64 = 0;

    for item in &req.items {
        let resource = resources
            .iter()
            .find(|r| r.resource_id == item.resource_id)
            .ok_or_else(|| {
                AppError::EntityNotFound(format!(
                    "設備（{}）が見つかりませんでした。",
                    item.resource_id
                ))
            })?;
        if !resource.is_active {
            return Err(AppError::UnprocessableEntity(format!(
                "設備（{}）は現在利用できません（is_active = false）",
                resource.resource_id
            )));
        }

        // 種別ごとのポリシー（時間の長さ・人数）を先に確認する
        resource
            .resource_type
            .policy()
            .validate(item.duration_minutes, item.people_count)?;

        let start = item.start_time;
        let end = start + Duration::minutes(i64::from(item.duration_minutes));
        let hours = config.hours.day_hours(start.date_naive());
        validate_booking_window(start, end, hours, config.slot_interval_minutes, now)?;

        let unit_amount = pricing::unit_amount(resource, &config.pricing);
        let total_amount = pricing::calculate_item_amount(
            resource.resource_type,
            unit_amount,
            item.duration_minutes,
            item.people_count,
        );
        subtotal += total_amount;

        coupon_items.push(CouponItem {
            resource_type: resource.resource_type,
            total_amount,
        });
        items.push(HoldItem {
            resource_id: resource.resource_id,
            pricing_mode: resource.resource_type.pricing_mode(),
            start_time: start,
            end_time: end,
            quantity: 1,
            people_count: item.people_count,
            unit_amount,
            total_amount,
            description: format!(
                "{} {}〜{}",
                resource.resource_name,
                start.format("%Y-%m-%d %H:%M"),
                end.format("%H:%M")
            ),
        });
    }

    // クーポンの検証は読み取りのみ。償還の記録は PAID 遷移まで行われない
    let discount_amount = match &req.coupon_code {
        Some(code) => {
            let coupon = coupon_repository
                .find_by_code(code)
                .await?
                .ok_or_else(|| AppError::CouponRejected("クーポンが見つかりません".into()))?;
            let usage = coupon_repository
                .usage_for(coupon.coupon_id, &req.customer.email)
                .await?;
            coupon
                .validate(&usage, &coupon_items, now)
                .map_err(|reason| AppError::CouponRejected(reason.to_string()))?
                .discount
        }
        None => 0,
    };

    let hold_expires_at = match req.payment_method {
        PaymentMethod::Online => Some(now + Duration::minutes(config.hold_minutes)),
        PaymentMethod::OnSiteCash => None,
    };

    Ok(CreateHold {
        items,
        customer: req.customer.into(),
        coupon_code: req.coupon_code,
        payment_method: req.payment_method,
        total_amount: subtotal - discount_amount,
        discount_amount,
        hold_expires_at,
        created_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::{CustomerRequest, HoldItemRequest};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use kernel::model::coupon::{Coupon, CouponUsage, DiscountType};
    use kernel::model::id::{CouponId, ResourceId};
    use kernel::model::resource::{Resource, ResourceType};
    use kernel::repository::coupon::MockCouponRepository;
    use kernel::repository::resource::MockResourceRepository;
    use shared::config::{BookingConfig, BusinessHoursConfig, PricingConfig};

    fn config() -> BookingConfig {
        BookingConfig {
            hold_minutes: 15,
            slot_interval_minutes: 60,
            hours: BusinessHoursConfig {
                open: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                close: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                closed_weekdays: vec![],
                closed_dates: vec![],
            },
            pricing: PricingConfig {
                bowling_lane_per_hour: 2400,
                billiards_table_per_hour: 1800,
                quiz_room_per_person: 1500,
                karaoke_room_per_person_hour: 800,
            },
        }
    }

    fn lane(resource_id: ResourceId) -> Resource {
        Resource {
            resource_id,
            resource_name: "レーン1".into(),
            resource_type: ResourceType::BowlingLane,
            capacity: 6,
            price_override: None,
            is_active: true,
        }
    }

    fn request(
        resource_id: ResourceId,
        duration_minutes: u32,
        coupon_code: Option<&str>,
        payment_method: PaymentMethod,
    ) -> CreateHoldRequest {
        CreateHoldRequest {
            items: vec![HoldItemRequest {
                resource_id,
                start_time: Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
                duration_minutes,
                people_count: None,
            }],
            customer: CustomerRequest {
                name: "山田 太郎".into(),
                email: "taro@example.com".into(),
                phone: "090-0000-0000".into(),
            },
            coupon_code: coupon_code.map(String::from),
            payment_method,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn resource_repo_with_lane(resource_id: ResourceId) -> MockResourceRepository {
        let mut repo = MockResourceRepository::new();
        repo.expect_find_by_ids()
            .returning(move |_| Ok(vec![lane(resource_id)]));
        repo
    }

    #[tokio::test]
    async fn test_online_hold_gets_expiry_and_price() {
        let resource_id = ResourceId::new();
        let resources = resource_repo_with_lane(resource_id);
        let coupons = MockCouponRepository::new();

        let event = build_create_hold(
            &resources,
            &coupons,
            &config(),
            request(resource_id, 120, None, PaymentMethod::Online),
            now(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(event.total_amount, 4800);
        assert_eq!(event.discount_amount, 0);
        assert_eq!(
            event.hold_expires_at,
            Some(now() + Duration::minutes(15))
        );
        assert_eq!(event.items.len(), 1);
        assert_eq!(event.items[0].unit_amount, 2400);
    }

    #[tokio::test]
    async fn test_onsite_hold_has_no_expiry() {
        let resource_id = ResourceId::new();
        let resources = resource_repo_with_lane(resource_id);
        let coupons = MockCouponRepository::new();

        let event = build_create_hold(
            &resources,
            &coupons,
            &config(),
            request(resource_id, 120, None, PaymentMethod::OnSiteCash),
            now(),
            None,
        )
        .await
        .unwrap();

        assert!(event.hold_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_policy_violation_is_rejected_before_any_write() {
        let resource_id = ResourceId::new();
        let resources = resource_repo_with_lane(resource_id);
        let coupons = MockCouponRepository::new();

        // ボウリングレーンの上限は 4 時間
        let err = build_create_hold(
            &resources,
            &coupons,
            &config(),
            request(resource_id, 300, None, PaymentMethod::Online),
            now(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidDuration(_)));
    }

    #[tokio::test]
    async fn test_coupon_discount_is_applied_to_total() {
        let resource_id = ResourceId::new();
        let resources = resource_repo_with_lane(resource_id);
        let mut coupons = MockCouponRepository::new();
        let coupon_id = CouponId::new();
        coupons.expect_find_by_code().returning(move |code| {
            Ok(Some(Coupon {
                coupon_id,
                code: code.into(),
                discount_type: DiscountType::Percent,
                value: 1000,
                applies_to_all: true,
                applicable_resource_types: vec![],
                valid_from: None,
                valid_to: None,
                min_total: Some(5000),
                max_uses_total: None,
                use_per_email: true,
                is_active: true,
            }))
        });
        coupons
            .expect_usage_for()
            .returning(|_, _| Ok(CouponUsage::default()));

        // 3 時間 × 2400 = 7200 に 10% 引き
        let event = build_create_hold(
            &resources,
            &coupons,
            &config(),
            request(resource_id, 180, Some("SAVE10"), PaymentMethod::Online),
            now(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(event.discount_amount, 720);
        assert_eq!(event.total_amount, 6480);

        // 最低金額未満なら CouponRejected
        let err = build_create_hold(
            &resources,
            &coupons,
            &config(),
            request(resource_id, 60, Some("SAVE10"), PaymentMethod::Online),
            now(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::CouponRejected(_)));
    }

    #[tokio::test]
    async fn test_closed_day_is_rejected() {
        let resource_id = ResourceId::new();
        let resources = resource_repo_with_lane(resource_id);
        let coupons = MockCouponRepository::new();
        let mut config = config();
        config.hours.closed_dates = vec![NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()];

        let err = build_create_hold(
            &resources,
            &coupons,
            &config,
            request(resource_id, 120, None, PaymentMethod::Online),
            now(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }
}
