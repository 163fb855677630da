use tracing::{info, instrument, warn};

use crate::error::{AdminError, Result};
use crate::users::dto::{
    role_preset, CreateUserAnswers, PasswordChoice, ProvisionAction, Provisioned,
    RotatedCredential, RotationFailure, RotationReport,
};
use crate::users::password::{
    generate_password, CredentialHasher, DEFAULT_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, Role, RoleSet, User, UserSummary};

/// Trims surrounding whitespace and keeps the case. Lookups match emails
/// case-insensitively, so `Alice@Example.com` and `alice@example.com` are the
/// same user.
fn clean_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        warn!("empty email");
        return Err(AdminError::InvalidEmail(email.to_string()));
    }
    Ok(email.to_string())
}

fn warn_if_no_roles(email: &str, roles: &RoleSet) {
    if roles.is_empty() {
        warn!(email = %email, "user has no roles and will not be able to do anything");
    }
}

/// Makes sure exactly one admin exists at `email` with the given password.
///
/// An existing user only gets its password hash replaced; its roles are left alone.
#[instrument(skip(repo, hasher, password))]
pub async fn ensure_admin_user(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
    email: &str,
    name: &str,
    password: &str,
) -> Result<Provisioned> {
    let email = clean_email(email)?;
    let hash = hasher.hash(password)?;

    if let Some(mut user) = repo.find_by_email(&email).await? {
        if !repo.update_password_hash(user.id, &hash).await? {
            return Err(AdminError::NotFound(user.email));
        }
        user.password_hash = hash;
        if !user.roles.contains(Role::Admin) {
            warn!(user_id = %user.id, roles = %user.roles, "existing user is not an admin; only the password was rotated");
        }
        info!(user_id = %user.id, email = %user.email, "admin password rotated");
        return Ok(Provisioned {
            user,
            password: Some(password.to_string()),
            action: ProvisionAction::PasswordRotated,
        });
    }

    let user = repo
        .insert(NewUser {
            name: name.to_string(),
            email,
            password_hash: hash,
            roles: [Role::Admin].into(),
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "admin user created");
    Ok(Provisioned {
        user,
        password: Some(password.to_string()),
        action: ProvisionAction::Created,
    })
}

/// Creates a user with `roles`, or overwrites the roles of an existing one.
///
/// Unlike [`ensure_admin_user`], an existing user keeps its password.
#[instrument(skip(repo, hasher, password))]
pub async fn ensure_multi_role_user(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
    email: &str,
    name: &str,
    roles: &RoleSet,
    password: &str,
) -> Result<Provisioned> {
    let email = clean_email(email)?;
    warn_if_no_roles(&email, roles);

    if let Some(existing) = repo.find_by_email(&email).await? {
        let user = repo
            .update_roles(&existing.email, roles)
            .await?
            .ok_or_else(|| AdminError::NotFound(existing.email.clone()))?;
        info!(user_id = %user.id, email = %user.email, roles = %user.roles, "roles updated");
        return Ok(Provisioned {
            user,
            password: None,
            action: ProvisionAction::RolesUpdated,
        });
    }

    let user = repo
        .insert(NewUser {
            name: name.to_string(),
            email,
            password_hash: hasher.hash(password)?,
            roles: roles.clone(),
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, roles = %user.roles, "user created");
    Ok(Provisioned {
        user,
        password: Some(password.to_string()),
        action: ProvisionAction::Created,
    })
}

/// Gives every user a fresh generated password, one user at a time.
///
/// A failure for one user is recorded in the report and does not undo or stop
/// the others. Only a failure to list users aborts the whole run.
#[instrument(skip(repo, hasher))]
pub async fn bulk_rotate_passwords(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
) -> Result<RotationReport> {
    let users = repo.list_all().await?;
    info!(count = users.len(), "rotating passwords");

    let mut report = RotationReport::default();
    for user in users {
        match rotate_one(repo, hasher, &user).await {
            Ok(password) => report.rotated.push(RotatedCredential {
                name: user.name,
                email: user.email,
                password,
            }),
            Err(e) => {
                warn!(user_id = %user.id, email = %user.email, error = %e, "password rotation failed");
                report.failed.push(RotationFailure {
                    name: user.name,
                    email: user.email,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        rotated = report.rotated.len(),
        failed = report.failed.len(),
        "password rotation finished"
    );
    Ok(report)
}

async fn rotate_one(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
    user: &UserSummary,
) -> Result<String> {
    let password = generate_password(DEFAULT_PASSWORD_LENGTH)?;
    let hash = hasher.hash(&password)?;
    if !repo.update_password_hash(user.id, &hash).await? {
        return Err(AdminError::NotFound(user.email.clone()));
    }
    Ok(password)
}

/// Creates one user from the answers of the interactive flow.
///
/// Manual passwords are checked before anything touches the repository.
#[instrument(skip(repo, hasher, answers), fields(email = %answers.email))]
pub async fn interactive_create_user(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
    answers: CreateUserAnswers,
) -> Result<Provisioned> {
    let roles = role_preset(&answers.role_choice);
    let password = match answers.password_choice {
        PasswordChoice::Generate => generate_password(DEFAULT_PASSWORD_LENGTH)?,
        PasswordChoice::Manual(pw) => {
            let actual = pw.chars().count();
            if actual < MIN_PASSWORD_LENGTH {
                warn!("password too short");
                return Err(AdminError::PasswordTooShort {
                    min: MIN_PASSWORD_LENGTH,
                    actual,
                });
            }
            pw
        }
    };
    let email = clean_email(&answers.email)?;
    if let Some(existing) = repo.find_by_email(&email).await? {
        warn!(user_id = %existing.id, "email already registered");
        return Err(AdminError::DuplicateEmail(existing.email));
    }

    let user = repo
        .insert(NewUser {
            name: answers.name.trim().to_string(),
            email,
            password_hash: hasher.hash(&password)?,
            roles,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, roles = %user.roles, "user created");
    Ok(Provisioned {
        user,
        password: Some(password),
        action: ProvisionAction::Created,
    })
}

pub async fn list_users(repo: &dyn UserRepository) -> Result<Vec<UserSummary>> {
    repo.list_all().await
}

pub async fn find_user(repo: &dyn UserRepository, email: &str) -> Result<User> {
    let email = clean_email(email)?;
    repo.find_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::NotFound(email.clone()))
}

/// Checks a plaintext password against the stored hash of the user at `email`.
#[instrument(skip(repo, hasher, password))]
pub async fn check_password(
    repo: &dyn UserRepository,
    hasher: &CredentialHasher,
    email: &str,
    password: &str,
) -> Result<bool> {
    let user = find_user(repo, email).await?;
    let matches = hasher.verify(password, &user.password_hash)?;
    info!(user_id = %user.id, matches, "password checked");
    Ok(matches)
}

#[instrument(skip(repo))]
pub async fn set_user_roles(
    repo: &dyn UserRepository,
    email: &str,
    roles: &RoleSet,
) -> Result<User> {
    let email = clean_email(email)?;
    warn_if_no_roles(&email, roles);
    let user = repo
        .update_roles(&email, roles)
        .await?
        .ok_or_else(|| AdminError::NotFound(email.clone()))?;
    info!(user_id = %user.id, email = %user.email, roles = %user.roles, "roles saved");
    Ok(user)
}
