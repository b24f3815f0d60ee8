//! Organization invite models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::OrgRole;

/// Invite lifecycle status
///
/// `WaitingApproval` invites were requested by a regular member and are not
/// externally acceptable until an admin approves them. `Pending` invites
/// carry an expiration and can be redeemed by the recipient. Deletion is the
/// only terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    WaitingApproval,
    Pending,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::WaitingApproval => "WAITING_APPROVAL",
            InviteStatus::Pending => "PENDING",
        }
    }

    pub fn parse(s: &str) -> Option<InviteStatus> {
        match s {
            "WAITING_APPROVAL" => Some(InviteStatus::WaitingApproval),
            "PENDING" => Some(InviteStatus::Pending),
            _ => None,
        }
    }
}

/// Team membership the invitee will receive on acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team_id: Uuid,
    pub role: String,
    /// Custom role deciding whether an EXTERNAL invitee behaves as a full
    /// member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_role_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationInvite {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub invite_code: String,
    pub role: OrgRole,
    pub team_assignments: Vec<TeamAssignment>,
    pub status: InviteStatus,
    /// NULL while waiting for approval; otherwise 48h from the moment the
    /// invite became PENDING
    pub expiration: Option<DateTime<Utc>>,
    /// Set on member-requested invites only
    pub requested_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl OrganizationInvite {
    /// An invite is live while its expiration is unset or in the future.
    /// Only live invites block duplicates and count against member limits.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            None => true,
            Some(exp) => exp > now,
        }
    }
}

/// One invite in a creation payload (admin-direct or member-request path)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvitePayload {
    #[validate(email)]
    pub email: String,
    pub role: OrgRole,
    #[serde(default)]
    pub team_assignments: Vec<TeamAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvitesRequest {
    #[validate(length(min = 1), nested)]
    pub invites: Vec<InvitePayload>,
}

/// Result of creating or approving one invite. `email_not_sent` reports a
/// best-effort notification failure; the invite itself is already durable.
#[derive(Debug, Clone, Serialize)]
pub struct InviteResult {
    pub invite: OrganizationInvite,
    pub email_not_sent: bool,
}
