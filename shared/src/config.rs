use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub booking: BookingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_or("DATABASE_PORT", "5432").parse().context("DATABASE_PORT")?,
            username: env_or("DATABASE_USERNAME", "app"),
            password: env_or("DATABASE_PASSWORD", "passwd"),
            database: env_or("DATABASE_NAME", "app"),
        };
        let redis = RedisConfig {
            host: env_or("REDIS_HOST", "localhost"),
            port: env_or("REDIS_PORT", "6379").parse().context("REDIS_PORT")?,
        };
        let auth = AuthConfig {
            ttl: env_or("AUTH_TOKEN_TTL", "86400").parse().context("AUTH_TOKEN_TTL")?,
        };
        let payment = PaymentConfig {
            base_url: env_or("PAYMENT_BASE_URL", "http://localhost:9000"),
            api_key: env_or("PAYMENT_API_KEY", ""),
        };
        let booking = BookingConfig::from_env()?;
        Ok(Self {
            database,
            redis,
            auth,
            payment,
            booking,
        })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

pub struct AuthConfig {
    pub ttl: u64,
}

pub struct PaymentConfig {
    pub base_url: String,
    pub api_key: String,
}

// 予約まわりのポリシー設定。
// ハンドラからは都度スナップショットとして渡し、グローバル可変状態にはしない
#[derive(Debug, Clone)]
pub struct BookingConfig {
    // 決済未完了のホールドを保持する時間（分）
    pub hold_minutes: i64,
    // 空き状況表示の区切り幅（分）
    pub slot_interval_minutes: u32,
    pub hours: BusinessHoursConfig,
    pub pricing: PricingConfig,
}

impl BookingConfig {
    pub fn from_env() -> Result<Self> {
        let open = parse_time(&env_or("BUSINESS_OPEN", "10:00")).context("BUSINESS_OPEN")?;
        let close = parse_time(&env_or("BUSINESS_CLOSE", "22:00")).context("BUSINESS_CLOSE")?;
        let closed_weekdays = env_or("CLOSED_WEEKDAYS", "")
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().parse::<Weekday>().context("CLOSED_WEEKDAYS"))
            .collect::<Result<Vec<_>>>()?;
        let closed_dates = env_or("CLOSED_DATES", "")
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").context("CLOSED_DATES")
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            hold_minutes: env_or("HOLD_MINUTES", "15").parse().context("HOLD_MINUTES")?,
            slot_interval_minutes: env_or("SLOT_INTERVAL_MINUTES", "60")
                .parse()
                .context("SLOT_INTERVAL_MINUTES")?,
            hours: BusinessHoursConfig {
                open,
                close,
                closed_weekdays,
                closed_dates,
            },
            pricing: PricingConfig::from_env()?,
        })
    }
}

// 曜日単位の営業時間と臨時休業日
#[derive(Debug, Clone)]
pub struct BusinessHoursConfig {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub closed_weekdays: Vec<Weekday>,
    pub closed_dates: Vec<NaiveDate>,
}

impl BusinessHoursConfig {
    // 指定日の営業時間を返す。休業日の場合は None
    pub fn day_hours(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        if self.closed_dates.contains(&date) || self.closed_weekdays.contains(&date.weekday()) {
            return None;
        }
        Some((self.open, self.close))
    }
}

// 料金のデフォルト値。すべて通貨の最小単位（円）の整数で持つ
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub bowling_lane_per_hour: i64,
    pub billiards_table_per_hour: i64,
    pub quiz_room_per_person: i64,
    pub karaoke_room_per_person_hour: i64,
}

impl PricingConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            bowling_lane_per_hour: env_or("PRICE_BOWLING_LANE_PER_HOUR", "2400")
                .parse()
                .context("PRICE_BOWLING_LANE_PER_HOUR")?,
            billiards_table_per_hour: env_or("PRICE_BILLIARDS_TABLE_PER_HOUR", "1800")
                .parse()
                .context("PRICE_BILLIARDS_TABLE_PER_HOUR")?,
            quiz_room_per_person: env_or("PRICE_QUIZ_ROOM_PER_PERSON", "1500")
                .parse()
                .context("PRICE_QUIZ_ROOM_PER_PERSON")?,
            karaoke_room_per_person_hour: env_or("PRICE_KARAOKE_ROOM_PER_PERSON_HOUR", "800")
                .parse()
                .context("PRICE_KARAOKE_ROOM_PER_PERSON_HOUR")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").context("時刻は HH:MM 形式で指定する")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_hours_returns_none_on_closed_date() {
        let hours = BusinessHoursConfig {
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            closed_weekdays: vec![Weekday::Tue],
            closed_dates: vec![NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()],
        };

        // 2025-06-10 は火曜かつ臨時休業日
        assert!(hours.day_hours(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()).is_none());
        // 2025-06-03 は火曜（定休日）
        assert!(hours.day_hours(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()).is_none());
        // 2025-06-01 は日曜で営業
        let open_close = hours.day_hours(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(
            open_close,
            Some((
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(22, 0, 0).unwrap()
            ))
        );
    }
}
