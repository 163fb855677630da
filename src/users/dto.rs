use serde::Serialize;

use crate::users::repo_types::{Role, RoleSet, User};

/// What a provisioning call did to the target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionAction {
    Created,
    PasswordRotated,
    RolesUpdated,
}

/// Result of a single-user provisioning operation.
///
/// `password` holds the plaintext for one-time display to the operator and is
/// `None` when the operation left the password untouched.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub user: User,
    pub password: Option<String>,
    pub action: ProvisionAction,
}

/// Menu presets offered when creating a user interactively.
pub const ROLE_PRESETS: [(&str, &[Role]); 5] = [
    ("1", &[Role::Student]),
    ("2", &[Role::Monitor]),
    ("3", &[Role::Admin]),
    ("4", &[Role::Student, Role::Monitor]),
    ("5", &[Role::Monitor, Role::Admin]),
];

/// Maps a menu answer to a role preset; anything unrecognised means `{student}`.
pub fn role_preset(choice: &str) -> RoleSet {
    let choice = choice.trim();
    ROLE_PRESETS
        .iter()
        .find(|(key, _)| *key == choice)
        .map(|(_, roles)| roles.iter().copied().collect())
        .unwrap_or_else(|| [Role::Student].into())
}

#[derive(Debug, Clone)]
pub enum PasswordChoice {
    Generate,
    Manual(String),
}

/// Answers collected by the interactive create flow.
#[derive(Debug, Clone)]
pub struct CreateUserAnswers {
    pub name: String,
    pub email: String,
    pub role_choice: String,
    pub password_choice: PasswordChoice,
}

/// One line of the one-time credential manifest.
#[derive(Debug, Clone, Serialize)]
pub struct RotatedCredential {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationFailure {
    pub name: String,
    pub email: String,
    pub reason: String,
}

/// Outcome of a bulk rotation. Successful rotations are committed even when
/// other users failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RotationReport {
    pub rotated: Vec<RotatedCredential>,
    pub failed: Vec<RotationFailure>,
}

impl RotationReport {
    /// Some users rotated and some failed.
    pub fn is_partial_failure(&self) -> bool {
        !self.rotated.is_empty() && !self.failed.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.rotated.is_empty() && !self.failed.is_empty()
    }
}
