use crate::Config;
use crate::auth::CurrentUser;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::appointment::{AppointmentListItemResponse, AppointmentRequest, AppointmentResponse};
use crate::models::pagination::PageParams;
use crate::service::appointment::AppointmentService;
use crate::service::clock::SystemClock;
use crate::service::date_format::DateFormatter;
use crate::service::email::Mailer;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;

/// List the current user's upcoming and past active appointments, 20 per page
#[openapi(tag = "Appointments")]
#[get("/?<page>")]
pub async fn list_appointments(
    pool: &State<PgPool>,
    config: &State<Config>,
    mailer: &State<Arc<dyn Mailer>>,
    formatter: &State<DateFormatter>,
    current_user: CurrentUser,
    page: Option<i64>,
) -> Result<Json<Vec<AppointmentListItemResponse>>, AppError> {
    let page = PageParams::from_query(page)?;
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = AppointmentService::new(&repo, mailer.inner().as_ref(), &SystemClock, formatter.inner(), &config.files.base_url);
    let appointments = service.list(current_user.id, &page).await?;
    Ok(Json(appointments))
}

/// Book an hour with a provider
#[openapi(tag = "Appointments")]
#[post("/", data = "<payload>")]
pub async fn create_appointment(
    pool: &State<PgPool>,
    config: &State<Config>,
    mailer: &State<Arc<dyn Mailer>>,
    formatter: &State<DateFormatter>,
    current_user: CurrentUser,
    payload: Result<JsonBody<AppointmentRequest>, AppError>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let command = payload?.into_inner().into_command(formatter.timezone())?;
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = AppointmentService::new(&repo, mailer.inner().as_ref(), &SystemClock, formatter.inner(), &config.files.base_url);
    let appointment = service.create(current_user.id, &command).await?;
    Ok(Json(appointment))
}

/// Cancel one of the current user's appointments, at least 2 hours ahead
#[openapi(tag = "Appointments")]
#[delete("/<id>")]
pub async fn cancel_appointment(
    pool: &State<PgPool>,
    config: &State<Config>,
    mailer: &State<Arc<dyn Mailer>>,
    formatter: &State<DateFormatter>,
    current_user: CurrentUser,
    id: i64,
) -> Result<Json<AppointmentResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = AppointmentService::new(&repo, mailer.inner().as_ref(), &SystemClock, formatter.inner(), &config.files.base_url);
    let appointment = service.cancel(current_user.id, id).await?;
    Ok(Json(appointment))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_appointments, create_appointment, cancel_appointment]
}
