use kernel::model::{id::StaffId, role::Role, staff::Staff};

#[derive(sqlx::FromRow)]
pub struct StaffRow {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub email: String,
    pub role: Role,
}

impl From<StaffRow> for Staff {
    fn from(value: StaffRow) -> Self {
        let StaffRow {
            staff_id,
            staff_name,
            email,
            role,
        } = value;
        Staff {
            staff_id,
            staff_name,
            email,
            role,
        }
    }
}
