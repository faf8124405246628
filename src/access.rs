//! Role resolution and record scoping.
//!
//! Every query that exposes or mutates leads, agents or categories takes its
//! filter from a [`Principal`]. A record outside the principal's scope is
//! reported as not found.

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Lead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Agent => "agent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "organizer" => Some(Role::Organizer),
            "agent" => Some(Role::Agent),
            _ => None,
        }
    }
}

/// The requesting user together with the organization they act in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Organizer {
        user_id: Uuid,
        organization_id: Uuid,
    },
    Agent {
        user_id: Uuid,
        agent_id: Uuid,
        organization_id: Uuid,
    },
}

impl Principal {
    /// Build a principal from the stored role and the profile / agent rows
    /// linked to the user. Returns `None` when the links don't match the role.
    pub fn resolve(
        user_id: Uuid,
        role: &str,
        profile_id: Option<Uuid>,
        agent: Option<(Uuid, Uuid)>,
    ) -> Option<Self> {
        match (Role::parse(role)?, profile_id, agent) {
            (Role::Organizer, Some(organization_id), _) => Some(Principal::Organizer {
                user_id,
                organization_id,
            }),
            (Role::Agent, _, Some((agent_id, organization_id))) => Some(Principal::Agent {
                user_id,
                agent_id,
                organization_id,
            }),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match *self {
            Principal::Organizer { user_id, .. } | Principal::Agent { user_id, .. } => user_id,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match *self {
            Principal::Organizer {
                organization_id, ..
            }
            | Principal::Agent {
                organization_id, ..
            } => organization_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Organizer { .. } => Role::Organizer,
            Principal::Agent { .. } => Role::Agent,
        }
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        match *self {
            Principal::Organizer { .. } => None,
            Principal::Agent { agent_id, .. } => Some(agent_id),
        }
    }

    pub fn is_organizer(&self) -> bool {
        matches!(self, Principal::Organizer { .. })
    }

    /// Returns the organization id for organizer-only operations.
    pub fn require_organizer(&self) -> Result<Uuid, AppError> {
        match *self {
            Principal::Organizer {
                organization_id, ..
            } => Ok(organization_id),
            Principal::Agent { .. } => Err(AppError::Forbidden(
                "Organizer access required".to_string(),
            )),
        }
    }

    /// Leads this principal may see: the whole organization for organizers,
    /// only their own assignments for agents.
    pub fn lead_scope(&self) -> LeadScope {
        LeadScope {
            organization_id: self.organization_id(),
            agent_id: self.agent_id(),
        }
    }
}

/// SQL-ready lead filter. `agent_id = None` means every lead of the
/// organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadScope {
    pub organization_id: Uuid,
    pub agent_id: Option<Uuid>,
}

impl LeadScope {
    pub fn permits(&self, lead: &Lead) -> bool {
        lead.organization_id == self.organization_id
            && match self.agent_id {
                None => true,
                Some(agent_id) => lead.agent_id == Some(agent_id),
            }
    }
}

/// Assignment-state filter applied on top of a [`LeadScope`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadFilter {
    #[default]
    All,
    Assigned,
    Unassigned,
}

impl LeadFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(LeadFilter::All),
            "assigned" => Some(LeadFilter::Assigned),
            "unassigned" => Some(LeadFilter::Unassigned),
            _ => None,
        }
    }

    /// Unassigned leads are an organizer view; agents only ever hold
    /// assigned leads.
    pub fn check_allowed(&self, principal: &Principal) -> Result<(), AppError> {
        if *self == LeadFilter::Unassigned && !principal.is_organizer() {
            return Err(AppError::Forbidden(
                "Organizer access required".to_string(),
            ));
        }
        Ok(())
    }

    /// Tri-state for the `$n::bool` query parameter: NULL for all,
    /// true for assigned, false for unassigned.
    pub fn assigned_param(&self) -> Option<bool> {
        match self {
            LeadFilter::All => None,
            LeadFilter::Assigned => Some(true),
            LeadFilter::Unassigned => Some(false),
        }
    }
}
