use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::models::staff::{StaffId, StaffUser};
use crate::repositories::StaffDirectory;
use crate::utils::error::AppResult;

// Read-only view of the staff accounts owned by the identity service
pub struct MySqlStaffDirectory {
    pool: MySqlPool,
}

impl MySqlStaffDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStaffDirectory { pool }
    }
}

#[async_trait]
impl StaffDirectory for MySqlStaffDirectory {
    async fn find(&self, id: &StaffId) -> AppResult<Option<StaffUser>> {
        let staff = sqlx::query_as::<_, StaffUser>(
            "SELECT id, username, email, role, status FROM staff_user WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }
}
