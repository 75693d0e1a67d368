use crate::config::SchedulingConfig;
use crate::error::app_error::AppError;
use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;

/// Used in the provider notification for a new booking.
pub const NOTIFICATION_DATE_PATTERN: &str = "dia %d de %B, às %-H:%Mh";
/// Used in the cancellation mail.
pub const CANCELLATION_DATE_PATTERN: &str = "%d de %B, às %-H:%Mh";

/// Renders appointment dates for humans in the configured locale and timezone.
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    pub fn new(locale: Locale, timezone: Tz) -> Self {
        Self { locale, timezone }
    }

    pub fn from_config(config: &SchedulingConfig) -> Result<Self, AppError> {
        let locale = Locale::try_from(config.locale.as_str()).map_err(|_| AppError::InvalidSetting(format!("unknown locale: {}", config.locale)))?;
        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|e| AppError::InvalidSetting(format!("unknown timezone {}: {}", config.timezone, e)))?;

        Ok(Self::new(locale, timezone))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn format(&self, date: DateTime<Utc>, pattern: &str) -> String {
        date.with_timezone(&self.timezone).format_localized(pattern, self.locale).to_string()
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(Locale::pt_BR, Tz::UTC)
    }
}
