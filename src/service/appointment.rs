use crate::database::appointment::AppointmentRepository;
use crate::database::notification::NotificationRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::appointment::{AppointmentListItemResponse, AppointmentResponse, CreateAppointment, NewAppointment, start_of_hour};
use crate::models::notification::NewNotification;
use crate::models::pagination::PageParams;
use crate::service::clock::Clock;
use crate::service::date_format::{CANCELLATION_DATE_PATTERN, DateFormatter, NOTIFICATION_DATE_PATTERN};
use crate::service::email::{CANCELLATION_TEMPLATE, MailMessage, Mailer};
use std::collections::BTreeMap;

pub const CANCELLATION_SUBJECT: &str = "Agendamento cancelado";

/// Everything the appointment rules need from persistence.
pub trait AppointmentStore: UserRepository + AppointmentRepository + NotificationRepository + Sync {}

impl<T> AppointmentStore for T where T: UserRepository + AppointmentRepository + NotificationRepository + Sync {}

/// Scheduling and cancellation policy. Built per request from its collaborators.
pub struct AppointmentService<'a, R> {
    repository: &'a R,
    mailer: &'a dyn Mailer,
    clock: &'a dyn Clock,
    formatter: &'a DateFormatter,
    files_base_url: &'a str,
}

impl<'a, R: AppointmentStore> AppointmentService<'a, R> {
    pub fn new(repository: &'a R, mailer: &'a dyn Mailer, clock: &'a dyn Clock, formatter: &'a DateFormatter, files_base_url: &'a str) -> Self {
        AppointmentService {
            repository,
            mailer,
            clock,
            formatter,
            files_base_url,
        }
    }

    /// The requester's active appointments, earliest first, one page at a time.
    pub async fn list(&self, user_id: i64, page: &PageParams) -> Result<Vec<AppointmentListItemResponse>, AppError> {
        let appointments = self.repository.list_user_appointments(user_id, page).await?;
        let now = self.clock.now();

        Ok(appointments
            .iter()
            .map(|item| AppointmentListItemResponse::new(item, now, self.files_base_url))
            .collect())
    }

    /// Books the provider's hour slot containing `command.date` for `user_id`
    /// and leaves the provider a notification.
    pub async fn create(&self, user_id: i64, command: &CreateAppointment) -> Result<AppointmentResponse, AppError> {
        let provider = self.repository.get_provider_by_id(command.provider_id).await?.ok_or(AppError::InvalidProvider)?;

        let hour = start_of_hour(command.date, self.formatter.timezone());

        let now = self.clock.now();
        if hour < now {
            return Err(AppError::PastDate);
        }

        if self.repository.find_active_appointment(provider.id, &hour).await?.is_some() {
            return Err(AppError::SlotUnavailable);
        }

        let requester = self
            .repository
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let appointment = self
            .repository
            .create_appointment(&NewAppointment {
                user_id,
                provider_id: provider.id,
                date: hour,
            })
            .await?;

        let content = format!(
            "Novo agendamento de {} para {}",
            requester.name,
            self.formatter.format(hour, NOTIFICATION_DATE_PATTERN)
        );
        let notification = self
            .repository
            .create_notification(&NewNotification {
                user_id: provider.id,
                content,
            })
            .await?;

        tracing::info!(
            appointment_id = appointment.id,
            notification_id = notification.id,
            provider_id = provider.id,
            user_id,
            date = %hour,
            "appointment created"
        );

        Ok(AppointmentResponse::new(&appointment, now))
    }

    /// Cancels the requester's appointment and e-mails the provider.
    pub async fn cancel(&self, user_id: i64, id: i64) -> Result<AppointmentResponse, AppError> {
        let detail = self
            .repository
            .get_appointment_detail(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found.".to_string()))?;

        if detail.appointment.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        if detail.appointment.is_canceled() {
            return Err(AppError::AlreadyCanceled);
        }

        let now = self.clock.now();
        if !detail.appointment.within_cancellation_window(now) {
            return Err(AppError::CancellationWindow);
        }

        // Lost a race with another cancel of the same row.
        let canceled = self.repository.cancel_appointment(id, &now).await?.ok_or(AppError::AlreadyCanceled)?;

        tracing::info!(appointment_id = id, provider_id = canceled.provider_id, user_id, "appointment canceled");

        let mut context = BTreeMap::new();
        context.insert("provider".to_string(), detail.provider.name.clone());
        context.insert("user".to_string(), detail.user.name.clone());
        context.insert("date".to_string(), self.formatter.format(canceled.date, CANCELLATION_DATE_PATTERN));

        self.mailer
            .send_mail(MailMessage {
                to: detail.provider.clone(),
                subject: CANCELLATION_SUBJECT.to_string(),
                template: CANCELLATION_TEMPLATE.to_string(),
                context,
            })
            .await?;

        Ok(AppointmentResponse::new(&canceled, now))
    }
}
