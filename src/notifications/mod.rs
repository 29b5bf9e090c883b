pub mod storage;
pub mod types;

pub use types::*;

use crate::database::Database;
use crate::error::AppError;

pub fn list(db: &Database, user_id: &str, unread_only: bool) -> Result<Vec<Notification>, AppError> {
    Ok(db.list_notifications(user_id, unread_only)?)
}

pub fn mark_read(db: &Database, id: &str, user_id: &str) -> Result<(), AppError> {
    if db.mark_notification_read(id, user_id)? {
        Ok(())
    } else {
        Err(AppError::not_found("Notification not found"))
    }
}

pub fn mark_all_read(db: &Database, user_id: &str) -> Result<usize, AppError> {
    Ok(db.mark_all_notifications_read(user_id)?)
}
