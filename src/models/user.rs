use rocket::serde::Serialize;
use schemars::JsonSchema;

/// End users and providers share this entity; `is_provider` tells them apart.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_provider: bool,
    pub avatar_id: Option<i64>,
}

/// An uploaded file used as a profile picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub id: i64,
    pub path: String,
}

impl Avatar {
    pub fn url(&self, files_base_url: &str) -> String {
        format!("{}/{}", files_base_url.trim_end_matches('/'), self.path.trim_start_matches('/'))
    }
}

/// Provider projection embedded in appointment listings.
#[derive(Debug, Clone, Default)]
pub struct ProviderSummary {
    pub id: i64,
    pub name: String,
    pub avatar: Option<Avatar>,
}

/// Name and address of a party to an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct AvatarResponse {
    pub id: i64,
    pub path: String,
    pub url: String,
}

impl AvatarResponse {
    pub fn new(avatar: &Avatar, files_base_url: &str) -> Self {
        Self {
            id: avatar.id,
            path: avatar.path.clone(),
            url: avatar.url(files_base_url),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ProviderSummaryResponse {
    pub id: i64,
    pub name: String,
    pub avatar: Option<AvatarResponse>,
}

impl ProviderSummaryResponse {
    pub fn new(provider: &ProviderSummary, files_base_url: &str) -> Self {
        Self {
            id: provider.id,
            name: provider.name.clone(),
            avatar: provider.avatar.as_ref().map(|avatar| AvatarResponse::new(avatar, files_base_url)),
        }
    }
}
