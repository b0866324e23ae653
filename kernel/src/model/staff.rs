use crate::model::{id::StaffId, role::Role};

#[derive(Debug, PartialEq, Eq)]
pub struct Staff {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub email: String,
    pub role: Role,
}
