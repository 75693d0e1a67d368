pub mod appointment;
pub mod clock;
pub mod date_format;
pub mod email;
