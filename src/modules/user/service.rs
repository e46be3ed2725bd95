use chrono::Utc;
use uuid::Uuid;

use crate::config::environment::SuperAdminSeed;
use crate::error::{AppError, Result};
use crate::modules::auth::model::{Role, User};
use crate::modules::auth::service::normalize_email;
use crate::services::hashing;
use crate::store::Store;

/// Creates the configured super-admin unless that email already exists.
/// Returns `true` when an account was created.
pub async fn ensure_super_admin(store: &dyn Store, seed: &SuperAdminSeed) -> Result<bool> {
    let email = normalize_email(&seed.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        role: Role::SuperAdmin,
        name: seed.name.clone(),
        email,
        password_hash: hashing::hash_password(&seed.password)?,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };

    match store.create_user(&user).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "super-admin account created");
            Ok(true)
        }
        // Soft-deleted owner of the same email: leave it alone.
        Err(AppError::EmailTaken) => Ok(false),
        Err(e) => Err(e),
    }
}
