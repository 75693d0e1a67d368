/// User resolved from a live session cookie.
#[derive(Debug, sqlx::FromRow)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}
