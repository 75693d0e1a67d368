pub mod appointment;
pub mod health;
pub mod notification;
pub mod pagination;
pub mod session;
pub mod user;
