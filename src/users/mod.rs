pub mod dto;
pub mod password;
pub mod prompt;
pub mod repo;
pub mod repo_types;
pub mod role_editor;
pub mod services;

#[cfg(test)]
mod fake;
