//! Organization (tenant) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization-level role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRole {
    /// Full administrative access
    Admin,
    /// Regular full member
    Member,
    /// Lite role family; may be elevated to full behavior by a custom role
    External,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Admin => "ADMIN",
            OrgRole::Member => "MEMBER",
            OrgRole::External => "EXTERNAL",
        }
    }

    pub fn parse(s: &str) -> Option<OrgRole> {
        match s {
            "ADMIN" => Some(OrgRole::Admin),
            "MEMBER" => Some(OrgRole::Member),
            "EXTERNAL" => Some(OrgRole::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership link between a user and an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationUser {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: OrgRole,
}

/// Custom role scoped to one organization
///
/// Permissions are `resource:action` strings (e.g. `workflows:view`,
/// `prompts:manage`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

/// Membership link between a user and a team, optionally carrying a
/// custom-role assignment that decides EXTERNAL users' member type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamUser {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub role: String,
    pub assigned_role_id: Option<Uuid>,
}
