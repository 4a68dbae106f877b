use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldErrors;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};
use crate::users::repo_types::Role;

pub const MIN_PASSWORD_LEN: usize = 6;

const EMAIL_INVALID: &str = "Invalid email format";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
const ROLE_INVALID: &str = "Role must be user or admin";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are stored trimmed and lowercased; lookups use the same form.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A create payload that passed validation. The password is still raw.
#[derive(Debug)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Fields an update will touch. The password is still raw.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub fn validate_new(req: CreateUserRequest) -> Result<NewUserInput, FieldErrors> {
    let name = non_blank(req.name);
    let email = non_blank(req.email);
    let password = req.password.filter(|p| !p.is_empty());

    // Missing fields are reported together before any format check.
    let mut errors = FieldErrors::new();
    if name.is_none() {
        errors.add("name", "Name is required");
    }
    if email.is_none() {
        errors.add("email", "Email is required");
    }
    if password.is_none() {
        errors.add("password", "Password is required");
    }
    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(errors);
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        errors.add("email", EMAIL_INVALID);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", PASSWORD_TOO_SHORT);
    }
    let role = match non_blank(req.role) {
        None => Role::default(),
        Some(r) => r.parse().unwrap_or_else(|_| {
            errors.add("role", ROLE_INVALID);
            Role::default()
        }),
    };

    errors.into_result(NewUserInput {
        name,
        email,
        password,
        role,
    })
}

/// Blank fields are ignored. An unknown role is dropped without error.
pub fn validate_update(req: UpdateUserRequest) -> Result<UserChanges, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = non_blank(req.email).map(|e| normalize_email(&e));
    if matches!(&email, Some(e) if !is_valid_email(e)) {
        errors.add("email", EMAIL_INVALID);
    }

    let password = req.password.filter(|p| !p.is_empty());
    if matches!(&password, Some(p) if p.chars().count() < MIN_PASSWORD_LEN) {
        errors.add("password", PASSWORD_TOO_SHORT);
    }

    let role = req.role.and_then(|r| r.parse::<Role>().ok());

    errors.into_result(UserChanges {
        name: non_blank(req.name),
        email,
        password,
        role,
    })
}
