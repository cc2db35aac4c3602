//! Role checks for admin-only endpoints.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{AuthUser, BackendClient};
use crate::error::{BackendError, Result};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    role: Option<String>,
}

/// Authenticate the caller and require `profiles.role = 'admin'`.
#[instrument(skip_all)]
pub async fn require_admin(client: &BackendClient, access_token: &str) -> Result<AuthUser> {
    let mut user = client.auth_user(access_token).await?;
    let filter = format!("eq.{}", user.id);
    let rows: Vec<ProfileRow> = client
        .select(&client.config().profiles_table, &[("id", filter.as_str())], "role")
        .await?;

    let role = rows.into_iter().next().and_then(|r| r.role);
    if role.as_deref() != Some(ADMIN_ROLE) {
        debug!(user = %user.id, ?role, "Admin check failed");
        return Err(BackendError::Forbidden("admin role required".to_string()));
    }
    user.role = role;
    Ok(user)
}
