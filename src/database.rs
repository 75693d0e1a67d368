pub mod appointment;
pub mod notification;
pub mod postgres_repository;
pub mod session;
pub mod user;
