use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::model::{Role, User};

/// Every demo account shares this password.
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// The user list the session layer authenticates against. Cloning shares the
/// same list.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Arc<RwLock<Vec<User>>>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<User>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<User>> {
        self.users.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn all(&self) -> Vec<User> {
        self.read().clone()
    }

    pub fn find(&self, id: &str) -> Option<User> {
        self.read().iter().find(|u| u.id == id).cloned()
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.read().iter().find(|u| u.email == email).cloned()
    }

    pub fn with_roles(&self, roles: &[Role]) -> Vec<User> {
        self.read()
            .iter()
            .filter(|u| roles.contains(&u.role))
            .cloned()
            .collect()
    }

    /// Exact email match plus the shared password. Deactivated accounts are
    /// treated as unknown.
    pub fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        match self.find_by_email(email) {
            Some(user) if user.is_active && password == DEMO_PASSWORD => {
                debug!("authenticated {}", user.email);
                Ok(user)
            }
            _ => Err(AppError::InvalidCredentials),
        }
    }

    pub fn register(&self, account: NewAccount) -> AppResult<User> {
        if account.email.trim().is_empty() {
            return Err(AppError::ValidationMissingField("email"));
        }
        if account.name.trim().is_empty() {
            return Err(AppError::ValidationMissingField("name"));
        }
        if account.password.is_empty() {
            return Err(AppError::ValidationMissingField("password"));
        }

        let mut users = self.write();
        if users.iter().any(|u| u.email == account.email) {
            return Err(AppError::UserExists);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: account.email,
            name: account.name,
            role: account.role,
            avatar: None,
            created_at: Utc::now(),
            is_active: true,
        };
        info!("registered {} as {}", user.email, user.role);
        users.push(user.clone());
        Ok(user)
    }

    /// Flips the active flag and returns the new value, or `None` when the
    /// id matches no user.
    pub fn toggle_active(&self, id: &str) -> Option<bool> {
        let mut users = self.write();
        let user = users.iter_mut().find(|u| u.id == id)?;
        user.is_active = !user.is_active;
        info!("user {} active={}", user.email, user.is_active);
        Some(user.is_active)
    }

    pub fn update_profile(&self, id: &str, name: String) -> Option<User> {
        let mut users = self.write();
        let user = users.iter_mut().find(|u| u.id == id)?;
        user.name = name;
        Some(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn directory() -> UserDirectory {
        UserDirectory::new(seed::demo_users())
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "secret".to_string(),
            name: "New Person".to_string(),
            role: Role::Attendee,
        }
    }

    #[test]
    fn admin_logs_in_with_the_shared_password() {
        let user = directory().authenticate("admin@ems.com", DEMO_PASSWORD).unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let result = directory().authenticate("admin@ems.com", "wrong");
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn email_match_is_exact() {
        let result = directory().authenticate("ADMIN@ems.com", DEMO_PASSWORD);
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn duplicate_registration_leaves_directory_unchanged() {
        let dir = directory();
        let before = dir.all();

        let result = dir.register(account("organizer@ems.com"));

        assert!(matches!(result, Err(AppError::UserExists)));
        assert_eq!(dir.all(), before);
    }

    #[test]
    fn registration_appends_a_fresh_user() {
        let dir = directory();
        let count = dir.all().len();

        let user = dir.register(account("new@ems.com")).unwrap();

        assert_eq!(dir.all().len(), count + 1);
        assert!(user.is_active);
        assert_eq!(dir.find_by_email("new@ems.com").unwrap().id, user.id);
    }

    #[test]
    fn registration_requires_a_name() {
        let mut incomplete = account("nameless@ems.com");
        incomplete.name = "  ".to_string();
        assert!(matches!(
            directory().register(incomplete),
            Err(AppError::ValidationMissingField("name"))
        ));
    }

    #[test]
    fn deactivated_accounts_cannot_log_in() {
        let dir = directory();
        let vendor = dir.find_by_email("vendor@ems.com").unwrap();

        assert_eq!(dir.toggle_active(&vendor.id), Some(false));
        assert!(dir.authenticate("vendor@ems.com", DEMO_PASSWORD).is_err());
        assert_eq!(dir.toggle_active("missing"), None);
    }

    #[test]
    fn toggling_twice_restores_the_account() {
        let dir = directory();
        let vendor = dir.find_by_email("vendor@ems.com").unwrap();

        assert_eq!(dir.toggle_active(&vendor.id), Some(false));
        assert_eq!(dir.toggle_active(&vendor.id), Some(true));
        assert!(dir.authenticate("vendor@ems.com", DEMO_PASSWORD).is_ok());
    }
}
