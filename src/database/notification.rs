use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::notification::{NewNotification, Notification};

#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn create_notification(&self, notification: &NewNotification) -> Result<Notification, AppError>;
}

#[async_trait::async_trait]
impl NotificationRepository for PostgresRepository {
    async fn create_notification(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, content)
            VALUES ($1, $2)
            RETURNING id, user_id, content, read, created_at
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }
}
