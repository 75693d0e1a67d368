use crate::database::postgres_repository::{PostgresRepository, is_unique_violation};
use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentDetail, AppointmentWithProvider, NewAppointment};
use crate::models::pagination::PageParams;
use crate::models::user::{Avatar, Contact, ProviderSummary};
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait AppointmentRepository {
    /// Active appointments booked by `user_id`, earliest first.
    async fn list_user_appointments(&self, user_id: i64, page: &PageParams) -> Result<Vec<AppointmentWithProvider>, AppError>;
    /// The non-canceled appointment holding the provider's slot at `date`, if any.
    async fn find_active_appointment(&self, provider_id: i64, date: &DateTime<Utc>) -> Result<Option<Appointment>, AppError>;
    /// Fails with `SlotUnavailable` when the slot was taken concurrently.
    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppError>;
    async fn get_appointment_detail(&self, id: i64) -> Result<Option<AppointmentDetail>, AppError>;
    /// Sets `canceled_at` unless already set; `None` when nothing was updated.
    async fn cancel_appointment(&self, id: i64, canceled_at: &DateTime<Utc>) -> Result<Option<Appointment>, AppError>;
}

#[derive(sqlx::FromRow)]
struct AppointmentWithProviderRow {
    id: i64,
    user_id: i64,
    provider_id: i64,
    date: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    provider_name: String,
    avatar_id: Option<i64>,
    avatar_path: Option<String>,
}

impl From<AppointmentWithProviderRow> for AppointmentWithProvider {
    fn from(row: AppointmentWithProviderRow) -> Self {
        let avatar = match (row.avatar_id, row.avatar_path) {
            (Some(id), Some(path)) => Some(Avatar { id, path }),
            _ => None,
        };

        Self {
            appointment: Appointment {
                id: row.id,
                user_id: row.user_id,
                provider_id: row.provider_id,
                date: row.date,
                canceled_at: row.canceled_at,
                created_at: row.created_at,
            },
            provider: ProviderSummary {
                id: row.provider_id,
                name: row.provider_name,
                avatar,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct AppointmentDetailRow {
    id: i64,
    user_id: i64,
    provider_id: i64,
    date: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    provider_name: String,
    provider_email: String,
    user_name: String,
    user_email: String,
}

impl From<AppointmentDetailRow> for AppointmentDetail {
    fn from(row: AppointmentDetailRow) -> Self {
        Self {
            appointment: Appointment {
                id: row.id,
                user_id: row.user_id,
                provider_id: row.provider_id,
                date: row.date,
                canceled_at: row.canceled_at,
                created_at: row.created_at,
            },
            provider: Contact {
                name: row.provider_name,
                email: row.provider_email,
            },
            user: Contact {
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for PostgresRepository {
    async fn list_user_appointments(&self, user_id: i64, page: &PageParams) -> Result<Vec<AppointmentWithProvider>, AppError> {
        let rows = sqlx::query_as::<_, AppointmentWithProviderRow>(
            r#"
            SELECT a.id,
                   a.user_id,
                   a.provider_id,
                   a.date,
                   a.canceled_at,
                   a.created_at,
                   p.name AS provider_name,
                   f.id AS avatar_id,
                   f.path AS avatar_path
            FROM appointments a
            JOIN users p ON p.id = a.provider_id
            LEFT JOIN files f ON f.id = p.avatar_id
            WHERE a.user_id = $1
              AND a.canceled_at IS NULL
            ORDER BY a.date ASC, a.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AppointmentWithProvider::from).collect())
    }

    async fn find_active_appointment(&self, provider_id: i64, date: &DateTime<Utc>) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, provider_id, date, canceled_at, created_at
            FROM appointments
            WHERE provider_id = $1
              AND date = $2
              AND canceled_at IS NULL
            "#,
        )
        .bind(provider_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppError> {
        let created = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (user_id, provider_id, date)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, provider_id, date, canceled_at, created_at
            "#,
        )
        .bind(appointment.user_id)
        .bind(appointment.provider_id)
        .bind(appointment.date)
        .fetch_one(&self.pool)
        .await;

        match created {
            Ok(created) => Ok(created),
            // appointments_active_slot_idx
            Err(err) if is_unique_violation(&err) => Err(AppError::SlotUnavailable),
            Err(err) => Err(AppError::db("Failed to create appointment", err)),
        }
    }

    async fn get_appointment_detail(&self, id: i64) -> Result<Option<AppointmentDetail>, AppError> {
        let row = sqlx::query_as::<_, AppointmentDetailRow>(
            r#"
            SELECT a.id,
                   a.user_id,
                   a.provider_id,
                   a.date,
                   a.canceled_at,
                   a.created_at,
                   p.name AS provider_name,
                   p.email AS provider_email,
                   u.name AS user_name,
                   u.email AS user_email
            FROM appointments a
            JOIN users p ON p.id = a.provider_id
            JOIN users u ON u.id = a.user_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AppointmentDetail::from))
    }

    async fn cancel_appointment(&self, id: i64, canceled_at: &DateTime<Utc>) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET canceled_at = $2
            WHERE id = $1
              AND canceled_at IS NULL
            RETURNING id, user_id, provider_id, date, canceled_at, created_at
            "#,
        )
        .bind(id)
        .bind(canceled_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn list_row_without_avatar_maps_to_none() {
        let row = AppointmentWithProviderRow {
            id: 1,
            user_id: 10,
            provider_id: 5,
            date: utc("2099-01-01T10:00:00Z"),
            canceled_at: None,
            created_at: utc("2098-12-01T00:00:00Z"),
            provider_name: "Carlos".to_string(),
            avatar_id: None,
            avatar_path: None,
        };

        let item = AppointmentWithProvider::from(row);
        assert_eq!(item.provider.id, 5);
        assert_eq!(item.provider.name, "Carlos");
        assert!(item.provider.avatar.is_none());
    }

    #[test]
    fn list_row_with_avatar_keeps_file() {
        let row = AppointmentWithProviderRow {
            id: 1,
            user_id: 10,
            provider_id: 5,
            date: utc("2099-01-01T10:00:00Z"),
            canceled_at: None,
            created_at: utc("2098-12-01T00:00:00Z"),
            provider_name: "Carlos".to_string(),
            avatar_id: Some(3),
            avatar_path: Some("carlos.png".to_string()),
        };

        let item = AppointmentWithProvider::from(row);
        assert_eq!(
            item.provider.avatar,
            Some(Avatar {
                id: 3,
                path: "carlos.png".to_string()
            })
        );
    }

    #[test]
    fn detail_row_splits_parties() {
        let row = AppointmentDetailRow {
            id: 9,
            user_id: 10,
            provider_id: 5,
            date: utc("2099-01-01T10:00:00Z"),
            canceled_at: None,
            created_at: utc("2098-12-01T00:00:00Z"),
            provider_name: "Carlos".to_string(),
            provider_email: "carlos@example.com".to_string(),
            user_name: "Ana".to_string(),
            user_email: "ana@example.com".to_string(),
        };

        let detail = AppointmentDetail::from(row);
        assert_eq!(detail.appointment.id, 9);
        assert_eq!(detail.provider.name, "Carlos");
        assert_eq!(detail.provider.email, "carlos@example.com");
        assert_eq!(detail.user.name, "Ana");
    }
}
