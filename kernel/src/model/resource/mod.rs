use crate::model::id::ResourceId;
use crate::model::order::PricingMode;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, EnumIter, EnumString};

pub mod event;

// 予約対象の設備種別。種別ごとに課金方式と予約ポリシーが決まる
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    EnumIter,
    sqlx::Type,
)]
#[sqlx(type_name = "resource_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    BowlingLane,
    BilliardsTable,
    QuizRoom,
    KaraokeRoom,
}

impl sqlx::postgres::PgHasArrayType for ResourceType {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_resource_type")
    }
}

impl ResourceType {
    pub fn pricing_mode(self) -> PricingMode {
        match self {
            ResourceType::BowlingLane | ResourceType::BilliardsTable => {
                PricingMode::PerResourcePerHour
            }
            ResourceType::QuizRoom => PricingMode::PerPersonPerSession,
            ResourceType::KaraokeRoom => PricingMode::PerPersonPerHour,
        }
    }

    // 種別ごとの予約ポリシー。
    // クイズルームはセッション長固定・人数上限あり、
    // それ以外は時間単位の下限・上限を持つ
    pub fn policy(self) -> BookingPolicy {
        match self {
            ResourceType::BowlingLane => BookingPolicy {
                fixed_duration_minutes: None,
                min_hours: 1,
                max_hours: 4,
                max_people: None,
            },
            ResourceType::BilliardsTable => BookingPolicy {
                fixed_duration_minutes: None,
                min_hours: 1,
                max_hours: 4,
                max_people: None,
            },
            ResourceType::QuizRoom => BookingPolicy {
                fixed_duration_minutes: Some(60),
                min_hours: 1,
                max_hours: 1,
                max_people: Some(8),
            },
            ResourceType::KaraokeRoom => BookingPolicy {
                fixed_duration_minutes: None,
                min_hours: 1,
                max_hours: 6,
                max_people: Some(12),
            },
        }
    }

    // 人数が料金計算に必要な種別かどうか
    pub fn requires_people_count(self) -> bool {
        matches!(self, ResourceType::QuizRoom | ResourceType::KaraokeRoom)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub fixed_duration_minutes: Option<u32>,
    pub min_hours: u32,
    pub max_hours: u32,
    pub max_people: Option<i32>,
}

impl BookingPolicy {
    // 予約時間の長さと人数をポリシーに照らして検証する。
    // 書き込み前に必ず呼ぶこと
    pub fn validate(&self, duration_minutes: u32, people_count: Option<i32>) -> AppResult<()> {
        if let Some(fixed) = self.fixed_duration_minutes {
            if duration_minutes != fixed {
                return Err(AppError::InvalidDuration(format!(
                    "この設備は {fixed} 分固定のセッション制です"
                )));
            }
        } else {
            if duration_minutes % 60 != 0 {
                return Err(AppError::InvalidDuration(
                    "予約時間は 1 時間単位で指定してください".into(),
                ));
            }
            let hours = duration_minutes / 60;
            if hours < self.min_hours || hours > self.max_hours {
                return Err(AppError::InvalidDuration(format!(
                    "予約時間は {} 時間以上 {} 時間以下で指定してください",
                    self.min_hours, self.max_hours
                )));
            }
        }

        match (self.max_people, people_count) {
            (Some(_), None) => {
                return Err(AppError::InvalidPeopleCount(
                    "この設備の予約には人数の指定が必要です".into(),
                ));
            }
            (Some(max), Some(n)) => {
                if n < 1 || n > max {
                    return Err(AppError::InvalidPeopleCount(format!(
                        "人数は 1 人以上 {max} 人以下で指定してください"
                    )));
                }
            }
            (None, Some(n)) if n < 1 => {
                return Err(AppError::InvalidPeopleCount(
                    "人数は 1 人以上で指定してください".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Resource {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub capacity: i32,
    // 設備単位の価格上書き。None の場合は設定のデフォルト単価を使う
    pub price_override: Option<i64>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ResourceType::BowlingLane, 120, None, true)]
    #[case(ResourceType::BowlingLane, 90, None, false)] // 1時間単位でない
    #[case(ResourceType::BowlingLane, 300, None, false)] // 上限超過
    #[case(ResourceType::QuizRoom, 60, Some(4), true)]
    #[case(ResourceType::QuizRoom, 120, Some(4), false)] // セッション長固定
    #[case(ResourceType::QuizRoom, 60, Some(9), false)] // 人数上限超過
    #[case(ResourceType::QuizRoom, 60, None, false)] // 人数必須
    #[case(ResourceType::KaraokeRoom, 360, Some(12), true)]
    #[case(ResourceType::KaraokeRoom, 420, Some(4), false)]
    fn test_booking_policy_validate(
        #[case] resource_type: ResourceType,
        #[case] duration_minutes: u32,
        #[case] people_count: Option<i32>,
        #[case] expected_ok: bool,
    ) {
        let result = resource_type.policy().validate(duration_minutes, people_count);
        assert_eq!(result.is_ok(), expected_ok);
    }
}
