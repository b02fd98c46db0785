//! Access control for mutation endpoints: a single admin-bypass combinator
//! wrapping per-entity ownership predicates.

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::store::User;

/// Decides whether `user` owns the resource with the given id. Backed by a
/// store lookup; a missing resource must surface as `NotFound` so callers
/// can tell 404 from 403.
#[async_trait]
pub trait OwnershipPredicate: Send + Sync {
    async fn user_owns(&self, user: &User, resource_id: i64) -> Result<bool, ApiError>;
}

/// For operations with no non-admin ownership path (role and tag mutation):
/// combined with the admin bypass this means "admin or nobody".
pub struct DenyAll;

#[async_trait]
impl OwnershipPredicate for DenyAll {
    async fn user_owns(&self, _user: &User, _resource_id: i64) -> Result<bool, ApiError> {
        Ok(false)
    }
}

pub fn is_admin(config: &AppConfig, user: &User) -> bool {
    user.role_id == config.security.admin_role_id
}

/// Gate a mutation: admins pass unconditionally, otherwise the ownership
/// predicate decides. `None` for the user means the policy was invoked
/// without a preceding authentication gate and is an unconditional deny.
pub async fn authorize(
    config: &AppConfig,
    user: Option<&User>,
    resource_id: i64,
    predicate: &dyn OwnershipPredicate,
) -> Result<(), ApiError> {
    let user = match user {
        Some(user) => user,
        None => return Err(ApiError::Forbidden),
    };
    if is_admin(config, user) {
        return Ok(());
    }
    if predicate.user_owns(user, resource_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::Utc;

    fn user_with_role(id: i64, role_id: i64) -> User {
        User {
            id,
            name: "t".into(),
            email: format!("u{}@app.com", id),
            password: String::new(),
            role_id,
            profile_img: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Always(bool);

    #[async_trait]
    impl OwnershipPredicate for Always {
        async fn user_owns(&self, _user: &User, _id: i64) -> Result<bool, ApiError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn admin_bypasses_predicate() {
        let config = AppConfig::for_tests();
        let admin = user_with_role(9, config.security.admin_role_id);
        assert!(authorize(&config, Some(&admin), 1, &Always(false)).await.is_ok());
        assert!(authorize(&config, Some(&admin), 1, &DenyAll).await.is_ok());
    }

    #[tokio::test]
    async fn owner_passes_non_owner_forbidden() {
        let config = AppConfig::for_tests();
        let user = user_with_role(2, 99);
        assert!(authorize(&config, Some(&user), 1, &Always(true)).await.is_ok());
        assert!(matches!(
            authorize(&config, Some(&user), 1, &Always(false)).await,
            Err(ApiError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn missing_user_is_forbidden() {
        let config = AppConfig::for_tests();
        assert!(matches!(
            authorize(&config, None, 1, &Always(true)).await,
            Err(ApiError::Forbidden)
        ));
    }
}
