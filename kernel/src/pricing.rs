use crate::model::resource::{Resource, ResourceType};
use shared::config::PricingConfig;

// 設備種別ごとの単価を決める。設備単位の上書きが設定より優先される
pub fn unit_amount(resource: &Resource, pricing: &PricingConfig) -> i64 {
    if let Some(price) = resource.price_override {
        return price;
    }
    match resource.resource_type {
        ResourceType::BowlingLane => pricing.bowling_lane_per_hour,
        ResourceType::BilliardsTable => pricing.billiards_table_per_hour,
        ResourceType::QuizRoom => pricing.quiz_room_per_person,
        ResourceType::KaraokeRoom => pricing.karaoke_room_per_person_hour,
    }
}

// 明細 1 行の金額計算。金額はすべて通貨の最小単位の整数で扱い、
// 浮動小数点は使わない。
//   ボウリング・ビリヤード: 時間数 × 時間単価
//   クイズルーム:           人数 × セッション単価（時間は固定）
//   カラオケルーム:         人数 × 時間数 × 人時単価
pub fn calculate_item_amount(
    resource_type: ResourceType,
    unit_amount: i64,
    duration_minutes: u32,
    people_count: Option<i32>,
) -> i64 {
    let hours = i64::from(duration_minutes / 60);
    let people = i64::from(people_count.unwrap_or(1));
    match resource_type {
        ResourceType::BowlingLane | ResourceType::BilliardsTable => hours * unit_amount,
        ResourceType::QuizRoom => people * unit_amount,
        ResourceType::KaraokeRoom => people * hours * unit_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::id::ResourceId;

    fn pricing() -> PricingConfig {
        PricingConfig {
            bowling_lane_per_hour: 2400,
            billiards_table_per_hour: 1800,
            quiz_room_per_person: 1500,
            karaoke_room_per_person_hour: 800,
        }
    }

    fn resource(resource_type: ResourceType, price_override: Option<i64>) -> Resource {
        Resource {
            resource_id: ResourceId::new(),
            resource_name: "テスト設備".into(),
            resource_type,
            capacity: 8,
            price_override,
            is_active: true,
        }
    }

    #[test]
    fn test_per_hour_pricing() {
        let lane = resource(ResourceType::BowlingLane, None);
        let unit = unit_amount(&lane, &pricing());
        assert_eq!(unit, 2400);
        assert_eq!(
            calculate_item_amount(ResourceType::BowlingLane, unit, 120, None),
            4800
        );

        let table = resource(ResourceType::BilliardsTable, None);
        let unit = unit_amount(&table, &pricing());
        assert_eq!(
            calculate_item_amount(ResourceType::BilliardsTable, unit, 180, None),
            5400
        );
    }

    #[test]
    fn test_quiz_room_is_per_person_per_session() {
        let room = resource(ResourceType::QuizRoom, None);
        let unit = unit_amount(&room, &pricing());
        // セッション長は固定なので時間は金額に影響しない
        assert_eq!(
            calculate_item_amount(ResourceType::QuizRoom, unit, 60, Some(4)),
            6000
        );
    }

    #[test]
    fn test_karaoke_is_per_person_per_hour() {
        let room = resource(ResourceType::KaraokeRoom, None);
        let unit = unit_amount(&room, &pricing());
        assert_eq!(
            calculate_item_amount(ResourceType::KaraokeRoom, unit, 120, Some(3)),
            4800
        );
    }

    #[test]
    fn test_resource_override_beats_default() {
        let lane = resource(ResourceType::BowlingLane, Some(3000));
        assert_eq!(unit_amount(&lane, &pricing()), 3000);
    }
}
