//! Line-oriented operator prompts. Everything here only gathers input; the
//! operations themselves live in `services`.

use std::io::{self, BufRead, Write};

use crate::users::dto::{CreateUserAnswers, PasswordChoice};
use crate::users::repo_types::{Role, RoleSet, User};
use crate::users::role_editor::{EditableUser, RoleEditor};

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> io::Result<String> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

/// Asks for whatever `known` is missing. `read_secret` reads a password without echo.
pub fn collect_create_answers<R, W, P>(
    input: &mut R,
    output: &mut W,
    mut read_secret: P,
    known: PartialAnswers,
) -> io::Result<CreateUserAnswers>
where
    R: BufRead,
    W: Write,
    P: FnMut(&str) -> io::Result<String>,
{
    let name = match known.name {
        Some(n) => n,
        None => ask(input, output, "Name: ")?,
    };
    let email = match known.email {
        Some(e) => e,
        None => ask(input, output, "Email: ")?,
    };
    let role_choice = match known.role_choice {
        Some(r) => r,
        None => {
            writeln!(output, "Roles:")?;
            writeln!(output, "  1) student")?;
            writeln!(output, "  2) monitor")?;
            writeln!(output, "  3) admin")?;
            writeln!(output, "  4) student + monitor")?;
            writeln!(output, "  5) monitor + admin")?;
            ask(input, output, "Choose [1-5, default 1]: ")?
        }
    };
    let password_choice = match known.password {
        Some(pw) => PasswordChoice::Manual(pw),
        None => {
            writeln!(output, "Password:")?;
            writeln!(output, "  1) generate")?;
            writeln!(output, "  2) enter manually")?;
            match ask(input, output, "Choose [1-2, default 1]: ")?.as_str() {
                "2" => PasswordChoice::Manual(read_secret("New password (min 8 chars): ")?),
                _ => PasswordChoice::Generate,
            }
        }
    };

    Ok(CreateUserAnswers {
        name,
        email,
        role_choice,
        password_choice,
    })
}

/// Answers supplied up front on the command line.
#[derive(Debug, Clone, Default)]
pub struct PartialAnswers {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_choice: Option<String>,
    pub password: Option<String>,
}

/// Runs the role editor on the console. Returns the roles to store, or `None`
/// when the operator cancelled.
pub fn edit_roles<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    user: &User,
) -> io::Result<Option<RoleSet>> {
    let mut decision: Option<Vec<Role>> = None;
    let mut editor = RoleEditor::new(
        EditableUser::from(user),
        |_, roles| decision = Some(roles),
        || {},
    );

    writeln!(output, "Editing roles for {} <{}>", user.name, user.email)?;
    loop {
        for (idx, (role, checked)) in editor.toggles().into_iter().enumerate() {
            let mark = if checked { "x" } else { " " };
            writeln!(output, "  {}) [{mark}] {role}", idx + 1)?;
        }
        let selected: Vec<&str> = editor.selected().iter().map(|r| r.as_str()).collect();
        writeln!(output, "  selected: {}", selected.join(", "))?;
        let answer = ask(input, output, "Toggle [1-3], (s)ave or (c)ancel: ")?;
        match answer.to_ascii_lowercase().as_str() {
            "s" | "save" => {
                editor.save();
                break;
            }
            "c" | "cancel" => {
                editor.cancel();
                break;
            }
            other => match other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| Role::ALL.get(i))
            {
                Some(&role) => editor.toggle(role),
                None => writeln!(output, "Unrecognised choice `{other}`")?,
            },
        }
    }

    Ok(decision.map(|roles| roles.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            roles: [Role::Student].into(),
        }
    }

    fn no_secret(_: &str) -> io::Result<String> {
        panic!("secret prompt not expected")
    }

    #[test]
    fn collects_all_answers_from_prompts() {
        let mut input = Cursor::new("Ada\nada@example.com\n5\n2\n");
        let mut output = Vec::new();
        let answers = collect_create_answers(
            &mut input,
            &mut output,
            |_| Ok("manual-secret".to_string()),
            PartialAnswers::default(),
        )
        .unwrap();

        assert_eq!(answers.name, "Ada");
        assert_eq!(answers.email, "ada@example.com");
        assert_eq!(answers.role_choice, "5");
        assert!(matches!(answers.password_choice, PasswordChoice::Manual(ref p) if p == "manual-secret"));
        assert!(String::from_utf8(output).unwrap().contains("monitor + admin"));
    }

    #[test]
    fn prefilled_answers_skip_prompts() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let answers = collect_create_answers(
            &mut input,
            &mut output,
            no_secret,
            PartialAnswers {
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
                role_choice: Some("3".into()),
                password: Some("preset-password".into()),
            },
        )
        .unwrap();
        assert_eq!(answers.role_choice, "3");
        assert!(output.is_empty());
    }

    #[test]
    fn default_password_choice_generates() {
        let mut input = Cursor::new("Ada\nada@example.com\n\n\n");
        let mut output = Vec::new();
        let answers =
            collect_create_answers(&mut input, &mut output, no_secret, PartialAnswers::default())
                .unwrap();
        assert!(matches!(answers.password_choice, PasswordChoice::Generate));
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut input = Cursor::new("Ada\n");
        let mut output = Vec::new();
        let err =
            collect_create_answers(&mut input, &mut output, no_secret, PartialAnswers::default())
                .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn role_editor_session_saves_toggled_roles() {
        let mut input = Cursor::new("2\n1\n9\ns\n");
        let mut output = Vec::new();
        let roles = edit_roles(&mut input, &mut output, &user()).unwrap();
        assert_eq!(roles, Some(RoleSet::from([Role::Monitor])));
        assert!(String::from_utf8(output).unwrap().contains("Unrecognised choice `9`"));
    }

    #[test]
    fn role_editor_session_cancel_returns_none() {
        let mut input = Cursor::new("3\nc\n");
        let mut output = Vec::new();
        assert_eq!(edit_roles(&mut input, &mut output, &user()).unwrap(), None);
    }
}
