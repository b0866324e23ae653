use crate::redis::model::{RedisKey, RedisValue};
use kernel::model::{auth::AccessToken, id::StaffId};
use shared::error::AppError;
use std::str::FromStr;

pub struct AuthorizationKey(String);

pub struct AuthorizedStaffId(StaffId);

impl AuthorizationKey {
    pub fn gen() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl From<AuthorizationKey> for AccessToken {
    fn from(value: AuthorizationKey) -> Self {
        AccessToken(value.0)
    }
}

impl From<&AccessToken> for AuthorizationKey {
    fn from(value: &AccessToken) -> Self {
        Self(value.0.to_string())
    }
}

impl RedisKey for AuthorizationKey {
    type Value = AuthorizedStaffId;

    fn inner(&self) -> String {
        self.0.to_string()
    }
}

impl AuthorizedStaffId {
    pub fn new(staff_id: StaffId) -> Self {
        Self(staff_id)
    }

    pub fn into_inner(self) -> StaffId {
        self.0
    }
}

impl RedisValue for AuthorizedStaffId {
    fn inner(&self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<String> for AuthorizedStaffId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(StaffId::from_str(&value)?))
    }
}
