use crate::database::appointment::AppointmentRepository;
use crate::database::notification::NotificationRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentDetail, AppointmentWithProvider, NewAppointment};
use crate::models::notification::{NewNotification, Notification};
use crate::models::pagination::PageParams;
use crate::models::user::{Avatar, Contact, ProviderSummary, User};
use crate::service::clock::Clock;
use crate::service::email::{MailMessage, Mailer};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn sample_user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        is_provider: false,
        avatar_id: None,
    }
}

pub fn sample_provider(id: i64, name: &str) -> User {
    User {
        is_provider: true,
        ..sample_user(id, name)
    }
}

pub fn sample_appointment(id: i64, user_id: i64, provider_id: i64, date: &str) -> Appointment {
    Appointment {
        id,
        user_id,
        provider_id,
        date: utc(date),
        canceled_at: None,
        created_at: utc("2098-11-01T00:00:00Z"),
    }
}

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    files: Vec<Avatar>,
    appointments: Vec<Appointment>,
    notifications: Vec<Notification>,
    slot_taken_on_insert: bool,
}

impl MockState {
    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn avatar_of(&self, user: &User) -> Option<Avatar> {
        let avatar_id = user.avatar_id?;
        self.files.iter().find(|f| f.id == avatar_id).cloned()
    }
}

/// In-memory store mirroring the Postgres queries, including the active-slot unique index.
#[derive(Default)]
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    /// Stores the file and makes it `user_id`'s avatar.
    pub fn with_avatar(self, user_id: i64, avatar: Avatar) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
                user.avatar_id = Some(avatar.id);
            }
            state.files.push(avatar);
        }
        self
    }

    pub fn with_appointment(self, appointment: Appointment) -> Self {
        self.state.lock().unwrap().appointments.push(appointment);
        self
    }

    /// Makes the next insert fail as if another request took the slot
    /// between the availability check and the write.
    pub fn with_slot_taken_on_insert(self) -> Self {
        self.state.lock().unwrap().slot_taken_on_insert = true;
        self
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().unwrap().appointments.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().unwrap().notifications.clone()
    }
}

#[async_trait::async_trait]
impl UserRepository for MockRepository {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().unwrap().user(id).cloned())
    }

    async fn get_provider_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().unwrap().user(id).filter(|u| u.is_provider).cloned())
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for MockRepository {
    async fn list_user_appointments(&self, user_id: i64, page: &PageParams) -> Result<Vec<AppointmentWithProvider>, AppError> {
        let state = self.state.lock().unwrap();
        let mut own: Vec<&Appointment> = state
            .appointments
            .iter()
            .filter(|a| a.user_id == user_id && !a.is_canceled())
            .collect();
        own.sort_by_key(|a| (a.date, a.id));

        Ok(own
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|a| {
                let provider = state.user(a.provider_id)?;
                Some(AppointmentWithProvider {
                    appointment: a.clone(),
                    provider: ProviderSummary {
                        id: provider.id,
                        name: provider.name.clone(),
                        avatar: state.avatar_of(provider),
                    },
                })
            })
            .collect())
    }

    async fn find_active_appointment(&self, provider_id: i64, date: &DateTime<Utc>) -> Result<Option<Appointment>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .appointments
            .iter()
            .find(|a| a.provider_id == provider_id && a.date == *date && !a.is_canceled())
            .cloned())
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, AppError> {
        let mut state = self.state.lock().unwrap();
        let taken = std::mem::take(&mut state.slot_taken_on_insert)
            || state
                .appointments
                .iter()
                .any(|a| a.provider_id == appointment.provider_id && a.date == appointment.date && !a.is_canceled());
        if taken {
            return Err(AppError::SlotUnavailable);
        }

        let created = Appointment {
            id: state.appointments.iter().map(|a| a.id).max().unwrap_or(0) + 1,
            user_id: appointment.user_id,
            provider_id: appointment.provider_id,
            date: appointment.date,
            canceled_at: None,
            created_at: Utc::now(),
        };
        state.appointments.push(created.clone());
        Ok(created)
    }

    async fn get_appointment_detail(&self, id: i64) -> Result<Option<AppointmentDetail>, AppError> {
        let state = self.state.lock().unwrap();
        let Some(appointment) = state.appointments.iter().find(|a| a.id == id) else {
            return Ok(None);
        };
        let (Some(provider), Some(user)) = (state.user(appointment.provider_id), state.user(appointment.user_id)) else {
            return Ok(None);
        };

        Ok(Some(AppointmentDetail {
            appointment: appointment.clone(),
            provider: Contact {
                name: provider.name.clone(),
                email: provider.email.clone(),
            },
            user: Contact {
                name: user.name.clone(),
                email: user.email.clone(),
            },
        }))
    }

    async fn cancel_appointment(&self, id: i64, canceled_at: &DateTime<Utc>) -> Result<Option<Appointment>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.appointments.iter_mut().find(|a| a.id == id && !a.is_canceled()).map(|a| {
            a.canceled_at = Some(*canceled_at);
            a.clone()
        }))
    }
}

#[async_trait::async_trait]
impl NotificationRepository for MockRepository {
    async fn create_notification(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        let mut state = self.state.lock().unwrap();
        let created = Notification {
            id: state.notifications.len() as i64 + 1,
            user_id: notification.user_id,
            content: notification.content.clone(),
            read: false,
            created_at: Utc::now(),
        };
        state.notifications.push(created.clone());
        Ok(created)
    }
}

/// Captures outgoing mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send_mail(&self, message: MailMessage) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::email("Failed to send email: connection refused"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
