use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{AdminError, Result};
use crate::users::dto::{Provisioned, RotationReport};
use crate::users::password::{generate_password, CredentialHasher, DEFAULT_PASSWORD_LENGTH};
use crate::users::prompt::{collect_create_answers, edit_roles, PartialAnswers};
use crate::users::repo::PgUserRepository;
use crate::users::repo_types::{RoleSet, UserSummary};
use crate::users::services;

#[derive(Parser)]
#[command(name = "roleadmin")]
#[command(version, about = "Provision users, rotate passwords and edit roles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the bundled database migrations
    Migrate,

    /// Create an admin, or reset the password of the user at that email
    EnsureAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Administrator")]
        name: String,

        /// Password to set; visible to other local users, prefer the env var or --prompt-password
        #[arg(long, env = "ROLEADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Read the password from the terminal without echo
        #[arg(long, conflicts_with = "password")]
        prompt_password: bool,
    },

    /// Create a user with the given roles, or overwrite the roles of an existing one
    EnsureUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// Comma separated roles, e.g. `student,monitor`
        #[arg(long)]
        roles: RoleSet,

        /// Password for a newly created user (generated when omitted)
        #[arg(long, env = "ROLEADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Read the password from the terminal without echo
        #[arg(long, conflicts_with = "password")]
        prompt_password: bool,
    },

    /// Give every user a new generated password and print the manifest once
    RotateAll {
        #[arg(long)]
        json: bool,
    },

    /// Create one user, prompting for anything not passed as a flag
    Create {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Role preset 1-5 (student, monitor, admin, student+monitor, monitor+admin)
        #[arg(long)]
        role_choice: Option<String>,

        /// Use this password instead of asking
        #[arg(long)]
        password: Option<String>,
    },

    /// List users (never shows password hashes)
    List {
        #[arg(long)]
        json: bool,
    },

    /// Check a password against the stored hash of one user
    CheckPassword {
        #[arg(long)]
        email: String,
    },

    /// Toggle the roles of one user interactively
    EditRoles {
        #[arg(long)]
        email: String,
    },
}

/// Runs one command against an open database. The caller owns and closes `db`.
pub async fn execute(command: Commands, db: &Database, hasher: &CredentialHasher) -> Result<ExitCode> {
    let repo = PgUserRepository::new(db.pool().clone());

    match command {
        Commands::Migrate => {
            db.migrate().await?;
            println!("Migrations applied.");
        }
        Commands::EnsureAdmin {
            email,
            name,
            password,
            prompt_password,
        } => {
            let password = resolve_password(password, prompt_password, read_hidden)?;
            let out = services::ensure_admin_user(&repo, hasher, &email, &name, &password).await?;
            print_provisioned(&out);
        }
        Commands::EnsureUser {
            email,
            name,
            roles,
            password,
            prompt_password,
        } => {
            let password = resolve_password(password, prompt_password, read_hidden)?;
            let out =
                services::ensure_multi_role_user(&repo, hasher, &email, &name, &roles, &password)
                    .await?;
            print_provisioned(&out);
        }
        Commands::RotateAll { json } => {
            let report = services::bulk_rotate_passwords(&repo, hasher).await?;
            print_report(&report, json)?;
            if report.all_failed() {
                return Ok(ExitCode::FAILURE);
            }
            if report.is_partial_failure() {
                warn!(failed = report.failed.len(), "some passwords were not rotated");
            }
        }
        Commands::Create {
            name,
            email,
            role_choice,
            password,
        } => {
            let answers = collect_create_answers(
                &mut io::stdin().lock(),
                &mut io::stdout(),
                read_hidden,
                PartialAnswers {
                    name,
                    email,
                    role_choice,
                    password,
                },
            )?;
            let out = services::interactive_create_user(&repo, hasher, answers).await?;
            print_provisioned(&out);
        }
        Commands::List { json } => {
            let users = services::list_users(&repo).await?;
            print_users(&users, json)?;
        }
        Commands::CheckPassword { email } => {
            let password = read_hidden("Password: ")?;
            if services::check_password(&repo, hasher, &email, &password).await? {
                println!("Password matches.");
            } else {
                println!("Password does not match.");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::EditRoles { email } => {
            let user = services::find_user(&repo, &email).await?;
            let edited = edit_roles(&mut io::stdin().lock(), &mut io::stdout(), &user)?;
            match edited {
                Some(roles) => {
                    let user = services::set_user_roles(&repo, &user.email, &roles).await?;
                    println!("Saved roles for {}: {}", user.email, user.roles);
                }
                None => {
                    info!(email = %user.email, "role edit cancelled");
                    println!("No changes saved.");
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_hidden(label: &str) -> io::Result<String> {
    rpassword::prompt_password(label)
}

/// Prompted password (entered twice), then the flag or env value, then a generated one.
fn resolve_password<P>(password: Option<String>, prompt: bool, mut read_secret: P) -> Result<String>
where
    P: FnMut(&str) -> io::Result<String>,
{
    if prompt {
        let first = read_secret("New password: ")?;
        let second = read_secret("Repeat password: ")?;
        if first != second {
            return Err(AdminError::PasswordMismatch);
        }
        return Ok(first);
    }
    match password {
        Some(pw) => Ok(pw),
        None => generate_password(DEFAULT_PASSWORD_LENGTH),
    }
}

/// The only place plaintext passwords are shown.
fn print_provisioned(out: &Provisioned) {
    println!("User {:?}: {} <{}>", out.action, out.user.name, out.user.email);
    println!("  id:    {}", out.user.id);
    println!("  roles: {}", out.user.roles);
    match &out.password {
        Some(pw) => println!("  password: {pw}  (shown once, store it now)"),
        None => println!("  password: unchanged"),
    }
}

fn print_report(report: &RotationReport, json: bool) -> Result<()> {
    if json {
        let body = serde_json::to_string_pretty(report).map_err(io::Error::from)?;
        println!("{body}");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    writeln!(out, "Rotated {} password(s):", report.rotated.len())?;
    for cred in &report.rotated {
        writeln!(out, "  {} <{}>  {}", cred.name, cred.email, cred.password)?;
    }
    if !report.failed.is_empty() {
        writeln!(out, "Failed for {} user(s):", report.failed.len())?;
        for failure in &report.failed {
            writeln!(out, "  {} <{}>: {}", failure.name, failure.email, failure.reason)?;
        }
    }
    Ok(())
}

fn print_users(users: &[UserSummary], json: bool) -> Result<()> {
    if json {
        let body = serde_json::to_string_pretty(users).map_err(io::Error::from)?;
        println!("{body}");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for user in users {
        writeln!(out, "{}  {}  <{}>", user.id, user.name, user.email)?;
    }
    writeln!(out, "{} user(s)", users.len())?;
    Ok(())
}
