use uuid::Uuid;

use crate::users::repo_types::{Role, User};

/// The part of a user the role editor needs.
#[derive(Debug, Clone)]
pub struct EditableUser {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

impl From<&User> for EditableUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            roles: user.roles.iter().collect(),
        }
    }
}

/// Local checkbox state for one user's roles.
///
/// Toggling never persists anything. `save` hands `(user id, roles)` to the
/// save callback, `cancel` drops the edits and only calls the cancel callback.
pub struct RoleEditor<S, C>
where
    S: FnOnce(Uuid, Vec<Role>),
    C: FnOnce(),
{
    user_id: Uuid,
    roles: Vec<Role>,
    on_save: S,
    on_cancel: C,
}

impl<S, C> RoleEditor<S, C>
where
    S: FnOnce(Uuid, Vec<Role>),
    C: FnOnce(),
{
    pub fn new(user: EditableUser, on_save: S, on_cancel: C) -> Self {
        let mut roles: Vec<Role> = Vec::with_capacity(Role::ALL.len());
        for role in user.roles {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self {
            user_id: user.id,
            roles,
            on_save,
            on_cancel,
        }
    }

    pub fn is_checked(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// One entry per known role, in canonical order.
    pub fn toggles(&self) -> Vec<(Role, bool)> {
        Role::ALL
            .iter()
            .map(|&role| (role, self.is_checked(role)))
            .collect()
    }

    /// Roles currently checked, in the order they were turned on.
    pub fn selected(&self) -> &[Role] {
        &self.roles
    }

    pub fn toggle(&mut self, role: Role) {
        match self.roles.iter().position(|&r| r == role) {
            Some(idx) => {
                self.roles.remove(idx);
            }
            None => self.roles.push(role),
        }
    }

    pub fn save(self) {
        (self.on_save)(self.user_id, self.roles);
    }

    pub fn cancel(self) {
        (self.on_cancel)();
    }
}
