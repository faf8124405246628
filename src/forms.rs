//! Request payloads and their validation.
//!
//! Each form validates into a typed input or a [`FieldErrors`] map keyed by
//! field name. Nothing is written before validation succeeds.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("static username pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

fn required_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > max {
        errors.add(
            field,
            &format!("Ensure this value has at most {max} characters."),
        );
    }
    value.to_string()
}

fn optional_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) -> String {
    let value = value.unwrap_or_default().trim();
    if value.chars().count() > max {
        errors.add(
            field,
            &format!("Ensure this value has at most {max} characters."),
        );
    }
    value.to_string()
}

fn email(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if !is_valid_email(value) {
        errors.add(field, "Enter a valid email address.");
    }
    value.to_string()
}

/// Whole numbers arrive as JSON numbers from the API client and as strings
/// from plain form posts. `None` when missing or blank.
fn whole_number(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<i32> {
    let parsed = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) if s.trim().is_empty() => return None,
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.add(field, "Enter a whole number.");
    }
    parsed
}

/// Id of a related row picked from a select. An unparseable id is reported
/// the same way as one from another organization.
fn choice_id(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<Uuid> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => match Uuid::parse_str(s) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(field, INVALID_CHOICE);
                None
            }
        },
        Some(_) => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_RE.is_match(value)
}

pub fn validate_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.len() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            &format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

fn username(errors: &mut FieldErrors, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add("username", REQUIRED);
    } else if !USERNAME_RE.is_match(value) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    value.to_string()
}

// ── Leads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LeadForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub age: Option<Value>,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    pub description: Option<String>,
    pub agent_id: Option<Value>,
    pub category_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadInput {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub phone_number: String,
    pub email: String,
    pub description: String,
    pub agent_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl LeadForm {
    pub fn validate(self) -> Result<LeadInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = required_text(&mut errors, "first_name", &self.first_name, 20);
        let last_name = required_text(&mut errors, "last_name", &self.last_name, 20);

        let age = whole_number(&mut errors, "age", self.age.as_ref()).unwrap_or(0);
        if age < 0 {
            errors.add("age", "Ensure this value is greater than or equal to 0.");
        }

        let phone_number = required_text(&mut errors, "phone_number", &self.phone_number, 20);
        let email = email(&mut errors, "email", &self.email);
        let description = optional_text(&mut errors, "description", self.description.as_deref(), 10_000);
        let agent_id = choice_id(&mut errors, "agent", self.agent_id.as_ref());
        let category_id = choice_id(&mut errors, "category", self.category_id.as_ref());

        errors.finish(LeadInput {
            first_name,
            last_name,
            age,
            phone_number,
            email,
            description,
            agent_id,
            category_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignAgentForm {
    pub agent_id: Option<Value>,
}

impl AssignAgentForm {
    pub fn validate(self) -> Result<Uuid, FieldErrors> {
        let mut errors = FieldErrors::new();
        match choice_id(&mut errors, "agent", self.agent_id.as_ref()) {
            Some(id) => Ok(id),
            None if errors.is_empty() => Err(FieldErrors::single("agent", REQUIRED)),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadCategoryForm {
    pub category_id: Option<Value>,
}

impl LeadCategoryForm {
    /// `None` clears the category.
    pub fn validate(self) -> Result<Option<Uuid>, FieldErrors> {
        let mut errors = FieldErrors::new();
        let category_id = choice_id(&mut errors, "category", self.category_id.as_ref());
        errors.finish(category_id)
    }
}

// ── Categories ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

impl CategoryForm {
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", &self.name, 30);
        errors.finish(name)
    }
}

// ── Agents ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AgentForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AgentForm {
    pub fn validate(self) -> Result<AgentInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = username(&mut errors, &self.username);
        let email = email(&mut errors, "email", &self.email);
        let first_name = optional_text(&mut errors, "first_name", self.first_name.as_deref(), 150);
        let last_name = optional_text(&mut errors, "last_name", self.last_name.as_deref(), 150);

        errors.finish(AgentInput {
            username,
            email,
            first_name,
            last_name,
        })
    }
}

// ── Accounts ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(self) -> Result<SignupInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = username(&mut errors, &self.username);
        let email = email(&mut errors, "email", &self.email);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            validate_password(&mut errors, "password1", &self.password1);
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.finish(SignupInput {
            username,
            email,
            password: self.password1,
        })
    }
}
