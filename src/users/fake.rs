use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AdminError, Result};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, RoleSet, User, UserSummary};

/// In-memory repository for tests. Emails match case-insensitively, like the
/// `lower(email)` lookups and index of the Postgres repository. Password
/// updates for emails listed in `failing_updates` fail with a database error.
#[derive(Default)]
pub struct FakeUserRepository {
    users: Mutex<Vec<User>>,
    failing_updates: Mutex<HashSet<String>>,
    inserts: Mutex<usize>,
}

impl FakeUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_password_update_for(&self, email: &str) {
        self.failing_updates.lock().unwrap().insert(email.to_string());
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn get(&self, email: &str) -> Option<User> {
        let users = self.users.lock().unwrap();
        position(&users, email).map(|idx| users[idx].clone())
    }

    pub fn insert_count(&self) -> usize {
        *self.inserts.lock().unwrap()
    }
}

/// Exact match first, then case-insensitive.
fn position(users: &[User], email: &str) -> Option<usize> {
    users.iter().position(|u| u.email == email).or_else(|| {
        let wanted = email.to_lowercase();
        users.iter().position(|u| u.email.to_lowercase() == wanted)
    })
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.get(email))
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if position(&users, &user.email).is_some() {
            return Err(AdminError::DuplicateEmail(user.email));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
        };
        users.push(created.clone());
        *self.inserts.lock().unwrap() += 1;
        Ok(created)
    }

    async fn update_roles(&self, email: &str, roles: &RoleSet) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(position(&users, email).map(|idx| {
            users[idx].roles = roles.clone();
            users[idx].clone()
        }))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        if self.failing_updates.lock().unwrap().contains(&user.email) {
            return Err(AdminError::Database(sqlx::Error::Protocol(
                "simulated update failure".into(),
            )));
        }
        user.password_hash = password_hash.to_string();
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<UserSummary>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| UserSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .collect())
    }
}
