use crate::model::id::CouponId;
use crate::model::resource::ResourceType;
use chrono::{DateTime, Utc};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString, sqlx::Type)]
#[sqlx(type_name = "discount_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    // value は basis point（1000 = 10.00%）
    Percent,
    // value は通貨の最小単位の金額
    Fixed,
}

#[derive(Debug)]
pub struct Coupon {
    pub coupon_id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub applies_to_all: bool,
    pub applicable_resource_types: Vec<ResourceType>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub min_total: Option<i64>,
    pub max_uses_total: Option<i64>,
    // true: 誰でも使えるがメールアドレスごとに 1 回まで
    // false: 事前にメールアドレス割当があるアドレスのみ使える
    pub use_per_email: bool,
    pub is_active: bool,
}

// リポジトリが読み取った利用状況のスナップショット。
// 検証は副作用を持たず、償還の記録は注文の PAID 遷移時にだけ行う
#[derive(Debug, Default)]
pub struct CouponUsage {
    pub redemption_count: i64,
    // use_per_email = false のクーポンに対する割当の有無と消費済みフラグ
    pub email_assignment: Option<EmailAssignment>,
    // use_per_email = true のクーポンをこのメールアドレスが償還済みか
    pub email_already_redeemed: bool,
}

#[derive(Debug)]
pub struct EmailAssignment {
    pub used: bool,
}

// 検証対象の明細（種別と割引前金額）
#[derive(Debug)]
pub struct CouponItem {
    pub resource_type: ResourceType,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponDiscount {
    pub discount: i64,
    pub total_after: i64,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejectReason {
    #[error("このクーポンは現在利用できません")]
    Inactive,
    #[error("クーポンの有効期間外です")]
    OutsideValidityWindow,
    #[error("クーポンの利用には {min} 円以上の注文が必要です")]
    BelowMinTotal { min: i64 },
    #[error("このクーポンは対象外の設備を含む注文には利用できません")]
    ResourceTypeNotApplicable,
    #[error("クーポンの利用回数上限に達しています")]
    UsageCapExceeded,
    #[error("このメールアドレスにはクーポンが割り当てられていません")]
    EmailNotAssigned,
    #[error("このクーポンは割当済みの 1 回分をすでに利用しています")]
    AssignmentAlreadyUsed,
    #[error("このメールアドレスはすでにこのクーポンを利用しています")]
    EmailAlreadyRedeemed,
}

impl Coupon {
    // 検証の順序は固定：有効フラグ → 有効期間 → 最低金額 →
    // 対象種別 → 総利用回数 → メールアドレス規則。
    // 割引額の計算は PERCENT が切り捨て、FIXED は合計金額を上限とする
    pub fn validate(
        &self,
        usage: &CouponUsage,
        items: &[CouponItem],
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, CouponRejectReason> {
        if !self.is_active {
            return Err(CouponRejectReason::Inactive);
        }

        if let Some(from) = self.valid_from {
            if now < from {
                return Err(CouponRejectReason::OutsideValidityWindow);
            }
        }
        if let Some(to) = self.valid_to {
            if now > to {
                return Err(CouponRejectReason::OutsideValidityWindow);
            }
        }

        let total: i64 = items.iter().map(|item| item.total_amount).sum();
        if let Some(min) = self.min_total {
            if total < min {
                return Err(CouponRejectReason::BelowMinTotal { min });
            }
        }

        if !self.applies_to_all {
            let all_applicable = items
                .iter()
                .all(|item| self.applicable_resource_types.contains(&item.resource_type));
            if !all_applicable {
                return Err(CouponRejectReason::ResourceTypeNotApplicable);
            }
        }

        if let Some(cap) = self.max_uses_total {
            if usage.redemption_count >= cap {
                return Err(CouponRejectReason::UsageCapExceeded);
            }
        }

        if self.use_per_email {
            if usage.email_already_redeemed {
                return Err(CouponRejectReason::EmailAlreadyRedeemed);
            }
        } else {
            match &usage.email_assignment {
                None => return Err(CouponRejectReason::EmailNotAssigned),
                Some(assignment) if assignment.used => {
                    return Err(CouponRejectReason::AssignmentAlreadyUsed)
                }
                Some(_) => {}
            }
        }

        let discount = match self.discount_type {
            // basis point の割合を合計に掛け、最小単位未満は切り捨てる
            DiscountType::Percent => total * self.value / 10_000,
            DiscountType::Fixed => self.value.min(total),
        };

        Ok(CouponDiscount {
            discount,
            total_after: total - discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn save10() -> Coupon {
        Coupon {
            coupon_id: CouponId::new(),
            code: "SAVE10".into(),
            discount_type: DiscountType::Percent,
            value: 1000, // 10.00%
            applies_to_all: true,
            applicable_resource_types: vec![],
            valid_from: None,
            valid_to: None,
            min_total: Some(5000),
            max_uses_total: Some(100),
            use_per_email: true,
            is_active: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn items(amount: i64) -> Vec<CouponItem> {
        vec![CouponItem {
            resource_type: ResourceType::BowlingLane,
            total_amount: amount,
        }]
    }

    #[test]
    fn test_save10_below_min_total_is_rejected() {
        let result = save10().validate(&CouponUsage::default(), &items(4000), now());
        assert_eq!(result, Err(CouponRejectReason::BelowMinTotal { min: 5000 }));
    }

    #[test]
    fn test_save10_discount_is_floored_percent() {
        let result = save10()
            .validate(&CouponUsage::default(), &items(6000), now())
            .unwrap();
        assert_eq!(result.discount, 600);
        assert_eq!(result.total_after, 5400);
    }

    #[test]
    fn test_fixed_discount_is_capped_at_total() {
        let coupon = Coupon {
            discount_type: DiscountType::Fixed,
            value: 10_000,
            min_total: None,
            ..save10()
        };
        let result = coupon
            .validate(&CouponUsage::default(), &items(6000), now())
            .unwrap();
        assert_eq!(result.discount, 6000);
        assert_eq!(result.total_after, 0);
    }

    #[test]
    fn test_usage_cap_is_enforced() {
        let usage = CouponUsage {
            redemption_count: 100,
            ..CouponUsage::default()
        };
        let result = save10().validate(&usage, &items(6000), now());
        assert_eq!(result, Err(CouponRejectReason::UsageCapExceeded));
    }

    #[test]
    fn test_validity_window_bounds() {
        let coupon = Coupon {
            valid_from: Some(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()),
            ..save10()
        };
        assert_eq!(
            coupon.validate(&CouponUsage::default(), &items(6000), now()),
            Err(CouponRejectReason::OutsideValidityWindow)
        );

        let coupon = Coupon {
            valid_to: Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()),
            ..save10()
        };
        assert_eq!(
            coupon.validate(&CouponUsage::default(), &items(6000), now()),
            Err(CouponRejectReason::OutsideValidityWindow)
        );
    }

    #[test]
    fn test_resource_type_restriction() {
        let coupon = Coupon {
            applies_to_all: false,
            applicable_resource_types: vec![ResourceType::KaraokeRoom],
            ..save10()
        };
        assert_eq!(
            coupon.validate(&CouponUsage::default(), &items(6000), now()),
            Err(CouponRejectReason::ResourceTypeNotApplicable)
        );
    }

    #[test]
    fn test_per_email_modes() {
        // use_per_email = true: 一度償還したメールアドレスは拒否
        let usage = CouponUsage {
            email_already_redeemed: true,
            ..CouponUsage::default()
        };
        assert_eq!(
            save10().validate(&usage, &items(6000), now()),
            Err(CouponRejectReason::EmailAlreadyRedeemed)
        );

        // use_per_email = false: 割当がなければ拒否、消費済み割当も拒否
        let assigned_only = Coupon {
            use_per_email: false,
            ..save10()
        };
        assert_eq!(
            assigned_only.validate(&CouponUsage::default(), &items(6000), now()),
            Err(CouponRejectReason::EmailNotAssigned)
        );
        let used = CouponUsage {
            email_assignment: Some(EmailAssignment { used: true }),
            ..CouponUsage::default()
        };
        assert_eq!(
            assigned_only.validate(&used, &items(6000), now()),
            Err(CouponRejectReason::AssignmentAlreadyUsed)
        );
        let unused = CouponUsage {
            email_assignment: Some(EmailAssignment { used: false }),
            ..CouponUsage::default()
        };
        assert!(assigned_only.validate(&unused, &items(6000), now()).is_ok());
    }
}
