mod agent;
mod audit_event;
mod category;
mod lead;
mod organization;
mod stored_token;
mod user;

pub use agent::Agent;
pub use audit_event::{AuditEvent, NewAuditEvent};
pub use category::{Category, CategoryWithCount};
pub use lead::{Lead, LeadSummary};
pub use organization::UserProfile;
pub use stored_token::StoredToken;
pub use user::User;
