use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crm::access::{LeadFilter, LeadScope, Principal, Role};
use crm::auth::{jwt, password, tokens};
use crm::error::AppError;
use crm::forms::{
    AgentForm, AssignAgentForm, CategoryForm, LeadCategoryForm, LeadForm, SignupForm,
};
use crm::models::Lead;
use crm::rate_limit::LoginRateLimiter;

fn lead(organization_id: Uuid, agent_id: Option<Uuid>) -> Lead {
    Lead {
        id: Uuid::now_v7(),
        organization_id,
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        age: 30,
        phone_number: "555-0100".to_string(),
        email: "jane@example.com".to_string(),
        description: String::new(),
        agent_id,
        category_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn organizer(organization_id: Uuid) -> Principal {
    Principal::Organizer {
        user_id: Uuid::now_v7(),
        organization_id,
    }
}

fn agent(organization_id: Uuid, agent_id: Uuid) -> Principal {
    Principal::Agent {
        user_id: Uuid::now_v7(),
        agent_id,
        organization_id,
    }
}

fn lead_form(value: serde_json::Value) -> LeadForm {
    serde_json::from_value(value).unwrap()
}

// ── Principal resolution ────────────────────────────────────────

#[test]
fn principal_resolves_from_role_and_links() {
    let user_id = Uuid::now_v7();
    let org = Uuid::now_v7();
    let agent_id = Uuid::now_v7();

    let p = Principal::resolve(user_id, "organizer", Some(org), None).unwrap();
    assert_eq!(p.role(), Role::Organizer);
    assert_eq!(p.organization_id(), org);
    assert_eq!(p.agent_id(), None);

    let p = Principal::resolve(user_id, "agent", None, Some((agent_id, org))).unwrap();
    assert_eq!(p.role(), Role::Agent);
    assert_eq!(p.organization_id(), org);
    assert_eq!(p.agent_id(), Some(agent_id));
    assert_eq!(p.user_id(), user_id);
}

#[test]
fn principal_requires_matching_links() {
    let user_id = Uuid::now_v7();
    let org = Uuid::now_v7();

    assert!(Principal::resolve(user_id, "organizer", None, Some((Uuid::now_v7(), org))).is_none());
    assert!(Principal::resolve(user_id, "agent", Some(org), None).is_none());
    assert!(Principal::resolve(user_id, "admin", Some(org), None).is_none());
}

#[test]
fn organizer_only_operations() {
    let org = Uuid::now_v7();
    assert_eq!(organizer(org).require_organizer().unwrap(), org);
    assert!(matches!(
        agent(org, Uuid::now_v7()).require_organizer(),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn role_round_trips_through_str() {
    for role in [Role::Organizer, Role::Agent] {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("Organizer"), None);
}

// ── Lead scoping ────────────────────────────────────────────────

#[test]
fn organizer_scope_covers_whole_organization() {
    let org = Uuid::now_v7();
    let scope = organizer(org).lead_scope();

    assert_eq!(scope, LeadScope { organization_id: org, agent_id: None });
    assert!(scope.permits(&lead(org, None)));
    assert!(scope.permits(&lead(org, Some(Uuid::now_v7()))));
    assert!(!scope.permits(&lead(Uuid::now_v7(), None)));
}

#[test]
fn agent_scope_covers_own_assignments_only() {
    let org = Uuid::now_v7();
    let agent_id = Uuid::now_v7();
    let scope = agent(org, agent_id).lead_scope();

    assert!(scope.permits(&lead(org, Some(agent_id))));
    assert!(!scope.permits(&lead(org, None)));
    assert!(!scope.permits(&lead(org, Some(Uuid::now_v7()))));
    assert!(!scope.permits(&lead(Uuid::now_v7(), Some(agent_id))));
}

#[test]
fn lead_filters_bind_assignment_state() {
    assert_eq!(LeadFilter::All.assigned_param(), None);
    assert_eq!(LeadFilter::Assigned.assigned_param(), Some(true));
    assert_eq!(LeadFilter::Unassigned.assigned_param(), Some(false));
}

#[test]
fn unassigned_filter_is_organizer_only() {
    let org = Uuid::now_v7();
    let agent = agent(org, Uuid::now_v7());

    assert!(LeadFilter::Unassigned.check_allowed(&organizer(org)).is_ok());
    assert!(LeadFilter::Unassigned.check_allowed(&agent).is_err());
    assert!(LeadFilter::All.check_allowed(&agent).is_ok());
    assert!(LeadFilter::Assigned.check_allowed(&agent).is_ok());

    assert_eq!(LeadFilter::parse("unassigned"), Some(LeadFilter::Unassigned));
    assert_eq!(LeadFilter::parse("everything"), None);
}

// ── Forms ───────────────────────────────────────────────────────

#[test]
fn lead_form_trims_and_defaults() {
    let input = lead_form(json!({
        "first_name": "  Jane ",
        "last_name": "Doe",
        "phone_number": "555-0100",
        "email": "jane@example.com",
    }))
    .validate()
    .unwrap();

    assert_eq!(input.first_name, "Jane");
    assert_eq!(input.age, 0);
    assert_eq!(input.description, "");
    assert_eq!(input.agent_id, None);
}

#[test]
fn lead_form_collects_every_field_error() {
    let errors = lead_form(json!({
        "first_name": "",
        "last_name": "x".repeat(21),
        "age": -3,
        "phone_number": "",
        "email": "nope",
    }))
    .validate()
    .unwrap_err();

    for field in ["first_name", "last_name", "age", "phone_number", "email"] {
        assert!(errors.contains(field), "missing error for {field}");
    }
}

#[test]
fn lead_form_length_limits_are_inclusive() {
    let twenty = "x".repeat(20);
    let result = lead_form(json!({
        "first_name": twenty,
        "last_name": twenty,
        "phone_number": twenty,
        "email": "a@b.co",
    }))
    .validate();
    assert!(result.is_ok());
}

#[test]
fn category_name_required_and_bounded() {
    let form = |name: &str| CategoryForm { name: name.to_string() };

    assert_eq!(form(" Hot ").validate().unwrap(), "Hot");
    assert!(form("   ").validate().unwrap_err().contains("name"));
    assert!(form(&"x".repeat(30)).validate().is_ok());
    assert!(form(&"x".repeat(31)).validate().is_err());
}

#[test]
fn assign_form_requires_agent() {
    let id = Uuid::now_v7();
    assert_eq!(AssignAgentForm { agent_id: Some(json!(id)) }.validate().unwrap(), id);

    let errors = AssignAgentForm { agent_id: None }.validate().unwrap_err();
    assert!(errors.contains("agent"));

    let errors = AssignAgentForm { agent_id: Some(json!("not-a-uuid")) }.validate().unwrap_err();
    assert!(errors.contains("agent"));
}

#[test]
fn lead_form_reports_wrongly_typed_fields() {
    let base = json!({
        "first_name": "Jane",
        "last_name": "Doe",
        "phone_number": "555-0100",
        "email": "jane@example.com",
    });
    let with = |key: &str, value: serde_json::Value| {
        let mut body = base.clone();
        body[key] = value;
        lead_form(body).validate()
    };

    assert!(with("age", json!("abc")).unwrap_err().contains("age"));
    assert!(with("age", json!(3_000_000_000_i64)).unwrap_err().contains("age"));
    assert!(with("age", json!(4.5)).unwrap_err().contains("age"));
    assert_eq!(with("age", json!("42")).unwrap().age, 42);
    assert_eq!(with("age", json!("")).unwrap().age, 0);

    assert!(with("agent_id", json!("nope")).unwrap_err().contains("agent"));
    assert!(with("category_id", json!(7)).unwrap_err().contains("category"));
    assert_eq!(with("category_id", json!("")).unwrap().category_id, None);
}

#[test]
fn lead_category_form_allows_clearing() {
    let id = Uuid::now_v7();
    let form = |value: serde_json::Value| -> LeadCategoryForm {
        serde_json::from_value(value).unwrap()
    };

    assert_eq!(form(json!({ "category_id": id })).validate().unwrap(), Some(id));
    assert_eq!(form(json!({ "category_id": null })).validate().unwrap(), None);
    assert_eq!(form(json!({})).validate().unwrap(), None);
    assert!(form(json!({ "category_id": "x" })).validate().unwrap_err().contains("category"));
}

#[test]
fn agent_form_validates_identity() {
    let ok = AgentForm {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        first_name: None,
        last_name: Some("Smith".to_string()),
    }
    .validate()
    .unwrap();
    assert_eq!(ok.first_name, "");
    assert_eq!(ok.last_name, "Smith");

    let errors = AgentForm {
        username: "has spaces".to_string(),
        email: "".to_string(),
        first_name: None,
        last_name: None,
    }
    .validate()
    .unwrap_err();
    assert!(errors.contains("username"));
    assert!(errors.contains("email"));
}

#[test]
fn signup_form_checks_passwords() {
    let form = |p1: &str, p2: &str| SignupForm {
        username: "boss".to_string(),
        email: "boss@example.com".to_string(),
        password1: p1.to_string(),
        password2: p2.to_string(),
    };

    assert_eq!(form("password123", "password123").validate().unwrap().password, "password123");

    let errors = form("password123", "password321").validate().unwrap_err();
    assert!(errors.contains("password2"));
    assert!(!errors.contains("password1"));

    let errors = form("short", "short").validate().unwrap_err();
    assert!(errors.contains("password1"));
}

#[test]
fn field_errors_serialize_as_map_of_lists() {
    let errors = AssignAgentForm { agent_id: None }.validate().unwrap_err();
    let value = serde_json::to_value(&errors).unwrap();
    assert_eq!(value, json!({ "agent": ["This field is required."] }));
}

// ── Credentials ─────────────────────────────────────────────────

#[test]
fn one_time_passwords_are_seven_digits() {
    for _ in 0..200 {
        let pw = password::generate_one_time();
        let n: u32 = pw.parse().unwrap();
        assert_eq!(pw.len(), 7);
        assert!((1_000_000..=9_999_999).contains(&n));
    }
}

#[test]
fn password_hash_verifies() {
    let hash = password::hash("password123").unwrap();
    assert!(password::verify("password123", &hash).unwrap());
    assert!(!password::verify("password124", &hash).unwrap());
}

#[test]
fn opaque_tokens_are_hashed_for_storage() {
    let a = tokens::generate();
    let b = tokens::generate();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_eq!(tokens::hash(&a), tokens::hash(&a));
    assert_ne!(tokens::hash(&a), a);
}

#[test]
fn access_tokens_name_only_the_user() {
    let user_id = Uuid::now_v7();
    let token = jwt::encode_token(&jwt::Claims::new(user_id), "secret").unwrap();

    assert_eq!(jwt::decode_token(&token, "secret").unwrap().sub, user_id);
    assert!(jwt::decode_token(&token, "other-secret").is_err());
}

// ── Login limiter ───────────────────────────────────────────────

#[test]
fn login_limiter_blocks_after_five_failures() {
    let limiter = LoginRateLimiter::new();

    for _ in 0..4 {
        limiter.record_failure("Boss");
        assert!(limiter.check("boss").is_ok());
    }
    limiter.record_failure("boss");
    assert!(limiter.check("BOSS").is_err());
    assert!(limiter.check("someone-else").is_ok());

    limiter.reset("boss");
    assert!(limiter.check("boss").is_ok());
}

#[test]
fn login_limiter_cleanup_drops_old_entries() {
    let limiter = LoginRateLimiter::new();
    for _ in 0..5 {
        limiter.record_failure("boss");
    }
    limiter.cleanup(Duration::ZERO);
    assert!(limiter.check("boss").is_ok());
}
