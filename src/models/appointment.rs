use crate::error::app_error::AppError;
use crate::models::user::{Contact, ProviderSummary, ProviderSummaryResponse};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::{Validate, ValidationError};

/// Minimum lead time before an appointment's start for it to be canceled.
pub const CANCELLATION_LEAD_HOURS: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub provider_id: i64,
    pub date: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.date < now
    }

    /// Latest instant at which the appointment may still be canceled.
    pub fn cancellation_deadline(&self) -> DateTime<Utc> {
        self.date - TimeDelta::hours(CANCELLATION_LEAD_HOURS)
    }

    /// Gate for an actual cancel: the deadline instant itself is still accepted.
    pub fn within_cancellation_window(&self, now: DateTime<Utc>) -> bool {
        now <= self.cancellation_deadline()
    }

    /// View flag: strictly more than the lead time remains. Differs from
    /// `within_cancellation_window` only at the deadline instant.
    pub fn is_cancelable(&self, now: DateTime<Utc>) -> bool {
        !self.is_canceled() && now < self.cancellation_deadline()
    }
}

/// Row to insert; `date` must already be hour aligned.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: i64,
    pub provider_id: i64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AppointmentWithProvider {
    pub appointment: Appointment,
    pub provider: ProviderSummary,
}

/// Appointment loaded together with both parties, as needed to cancel it.
#[derive(Debug, Clone)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub provider: Contact,
    pub user: Contact,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct AppointmentRequest {
    #[serde(alias = "providerId")]
    #[validate(range(min = 1))]
    pub provider_id: i64,
    /// ISO-8601 date-time; values without an offset are read in the scheduling timezone.
    #[validate(custom(function = "validate_appointment_date"))]
    pub date: String,
}

/// Strongly typed booking command handed to the appointment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAppointment {
    pub provider_id: i64,
    pub date: DateTime<Utc>,
}

impl AppointmentRequest {
    pub fn into_command(self, timezone: Tz) -> Result<CreateAppointment, AppError> {
        self.validate()?;
        let date = parse_requested_date(&self.date, timezone).ok_or_else(|| AppError::validation(format!("unparsable date: {}", self.date)))?;

        Ok(CreateAppointment {
            provider_id: self.provider_id,
            date,
        })
    }
}

fn validate_appointment_date(date: &str) -> Result<(), ValidationError> {
    if parse_requested_date(date, Tz::UTC).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_iso_datetime"))
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS[.f]]` and bare `YYYY-MM-DD`.
pub fn parse_requested_date(raw: &str, timezone: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|day| day.and_hms_opt(0, 0, 0)))?;

    timezone.from_local_datetime(&naive).earliest().map(|date| date.with_timezone(&Utc))
}

/// Truncate to the start of the hour as seen in `timezone`; this is the slot key.
///
/// Works on the absolute instant so hours repeated by a DST fall-back still resolve.
pub fn start_of_hour(date: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let local = date.with_timezone(&timezone);
    date - TimeDelta::minutes(i64::from(local.minute()))
        - TimeDelta::seconds(i64::from(local.second()))
        - TimeDelta::nanoseconds(i64::from(local.nanosecond()))
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct AppointmentResponse {
    pub id: i64,
    pub user_id: i64,
    pub provider_id: i64,
    pub date: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub past: bool,
    pub cancelable: bool,
}

impl AppointmentResponse {
    pub fn new(appointment: &Appointment, now: DateTime<Utc>) -> Self {
        Self {
            id: appointment.id,
            user_id: appointment.user_id,
            provider_id: appointment.provider_id,
            date: appointment.date,
            canceled_at: appointment.canceled_at,
            past: appointment.is_past(now),
            cancelable: appointment.is_cancelable(now),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct AppointmentListItemResponse {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub past: bool,
    pub cancelable: bool,
    pub provider: ProviderSummaryResponse,
}

impl AppointmentListItemResponse {
    pub fn new(item: &AppointmentWithProvider, now: DateTime<Utc>, files_base_url: &str) -> Self {
        Self {
            id: item.appointment.id,
            date: item.appointment.date,
            past: item.appointment.is_past(now),
            cancelable: item.appointment.is_cancelable(now),
            provider: ProviderSummaryResponse::new(&item.provider, files_base_url),
        }
    }
}
