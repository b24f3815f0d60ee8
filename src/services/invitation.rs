//! Invitation service
//!
//! Owns the invite state machine. Invites enter as WAITING_APPROVAL (member
//! request) or PENDING (admin direct), move WAITING_APPROVAL -> PENDING on
//! approval, and leave only by deletion.
//!
//! The approval transition re-resolves the plan and re-counts members at
//! approval time. The gap between request and approval can be days, so the
//! check performed at request time is treated as stale by definition.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{DbPool, InviteRepository, MemberRepository, OrganizationRepository};
use crate::models::{
    InvitePayload, InviteResult, InviteStatus, MemberType, Organization, OrganizationInvite,
    OrgRole,
};
use crate::services::license::LimitType;
use crate::services::mailer::InviteNotifier;
use crate::services::plan::PlanProvider;
use crate::utils::{AppError, AppResult};

/// Invites expire 48 hours after becoming PENDING, whether that happens at
/// admin creation or at approval.
const INVITE_TTL_HOURS: i64 = 48;

const INVITE_CODE_LEN: usize = 16;

#[derive(Clone)]
pub struct InvitationService {
    db: DbPool,
    plans: Arc<dyn PlanProvider>,
    notifier: Arc<dyn InviteNotifier>,
}

impl InvitationService {
    pub fn new(db: DbPool, plans: Arc<dyn PlanProvider>, notifier: Arc<dyn InviteNotifier>) -> Self {
        Self { db, plans, notifier }
    }

    /// Member-requested invites: created WAITING_APPROVAL with no
    /// expiration, no email sent. Capacity is checked for the prospective
    /// counts including the new invites, so a request that could never be
    /// approved fails immediately.
    pub async fn create_invite_requests(
        &self,
        organization_id: Uuid,
        requested_by: Uuid,
        payloads: Vec<InvitePayload>,
    ) -> AppResult<Vec<OrganizationInvite>> {
        self.require_organization(organization_id).await?;
        let payloads = self.validate_payloads(organization_id, payloads).await?;

        for payload in &payloads {
            if payload.role == OrgRole::Admin {
                return Err(AppError::ValidationError(
                    "Members cannot request ADMIN invitations".to_string(),
                ));
            }
        }

        let plan = self.plans.active_plan(organization_id, Some(requested_by)).await?;
        if !plan.override_adding_limitations {
            let members = MemberRepository::new(&self.db);
            let counts = members
                .member_counts(organization_id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            let mut added_full = 0i64;
            let mut added_lite = 0i64;
            for payload in &payloads {
                match members
                    .classify_assignments(payload.role, &payload.team_assignments)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                {
                    MemberType::Full => added_full += 1,
                    MemberType::Lite => added_lite += 1,
                }
            }

            if counts.full + added_full > plan.max_members {
                return Err(AppError::LimitExceeded {
                    limit_type: LimitType::Members,
                    current: counts.full,
                    max: plan.max_members,
                });
            }
            if counts.lite + added_lite > plan.max_members_lite {
                return Err(AppError::LimitExceeded {
                    limit_type: LimitType::MembersLite,
                    current: counts.lite,
                    max: plan.max_members_lite,
                });
            }
        }

        let now = Utc::now();
        let invites: Vec<OrganizationInvite> = payloads
            .into_iter()
            .map(|payload| OrganizationInvite {
                id: Uuid::new_v4(),
                organization_id,
                email: payload.email,
                invite_code: generate_invite_code(),
                role: payload.role,
                team_assignments: payload.team_assignments,
                status: InviteStatus::WaitingApproval,
                expiration: None,
                requested_by: Some(requested_by),
                created_at: now,
            })
            .collect();

        InviteRepository::new(&self.db)
            .insert_batch(&invites)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            organization_id = %organization_id,
            requested_by = %requested_by,
            count = invites.len(),
            "Invite requests created, waiting for approval"
        );

        Ok(invites)
    }

    /// Admin-direct invites: created PENDING with a 48h expiration in one
    /// atomic group, then each recipient is notified independently after
    /// commit. A failed email never rolls an invite back; it is reported on
    /// that invite's result alone.
    pub async fn create_invites(
        &self,
        organization_id: Uuid,
        payloads: Vec<InvitePayload>,
    ) -> AppResult<Vec<InviteResult>> {
        let organization = self.require_organization(organization_id).await?;
        let payloads = self.validate_payloads(organization_id, payloads).await?;

        let now = Utc::now();
        let expiration = now + Duration::hours(INVITE_TTL_HOURS);
        let invites: Vec<OrganizationInvite> = payloads
            .into_iter()
            .map(|payload| OrganizationInvite {
                id: Uuid::new_v4(),
                organization_id,
                email: payload.email,
                invite_code: generate_invite_code(),
                role: payload.role,
                team_assignments: payload.team_assignments,
                status: InviteStatus::Pending,
                expiration: Some(expiration),
                requested_by: None,
                created_at: now,
            })
            .collect();

        InviteRepository::new(&self.db)
            .insert_batch(&invites)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Post-commit side effect: per-invite, individually failable.
        let mut results = Vec::with_capacity(invites.len());
        for invite in invites {
            let email_not_sent = !self.notify(&organization, &invite).await;
            results.push(InviteResult {
                invite,
                email_not_sent,
            });
        }

        info!(
            organization_id = %organization_id,
            count = results.len(),
            "Invites created"
        );

        Ok(results)
    }

    /// Approve a WAITING_APPROVAL invite.
    ///
    /// Capacity is re-checked against current plan and counts; the counts
    /// observed when the request was made are never reused. On rejection the
    /// invite stays WAITING_APPROVAL untouched. The 48h expiration runs from
    /// approval time, not request time.
    pub async fn approve_invite(
        &self,
        organization_id: Uuid,
        invite_id: Uuid,
    ) -> AppResult<InviteResult> {
        let organization = self.require_organization(organization_id).await?;
        let repo = InviteRepository::new(&self.db);

        let invite = repo
            .get(organization_id, invite_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::InviteNotEligible("Invite not found".to_string()))?;

        if invite.status != InviteStatus::WaitingApproval {
            return Err(AppError::InviteNotEligible(
                "Invite is not waiting for approval".to_string(),
            ));
        }

        let plan = self.plans.active_plan(organization_id, None).await?;
        if !plan.override_adding_limitations {
            let members = MemberRepository::new(&self.db);
            // The waiting invite is live, so it is already part of these
            // counts; exceeding the maximum means approving it would leave
            // the organization over capacity.
            let counts = members
                .member_counts(organization_id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let member_type = members
                .classify_assignments(invite.role, &invite.team_assignments)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            let (limit_type, current, max) = match member_type {
                MemberType::Full => (LimitType::Members, counts.full, plan.max_members),
                MemberType::Lite => (LimitType::MembersLite, counts.lite, plan.max_members_lite),
            };

            if current > max {
                warn!(
                    organization_id = %organization_id,
                    invite_id = %invite_id,
                    limit_type = %limit_type,
                    current,
                    max,
                    "Invite approval rejected, capacity no longer available"
                );
                return Err(AppError::LimitExceeded {
                    limit_type,
                    current,
                    max,
                });
            }
        }

        let expiration = Utc::now() + Duration::hours(INVITE_TTL_HOURS);
        let updated = repo
            .mark_pending(organization_id, invite_id, expiration)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if !updated {
            // Lost a race with a concurrent approval or deletion.
            return Err(AppError::InviteNotEligible(
                "Invite is not waiting for approval".to_string(),
            ));
        }

        let invite = repo
            .get(organization_id, invite_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Internal("Approved invite disappeared".to_string()))?;

        let email_not_sent = !self.notify(&organization, &invite).await;

        info!(
            organization_id = %organization_id,
            invite_id = %invite_id,
            email_not_sent,
            "Invite approved"
        );

        Ok(InviteResult {
            invite,
            email_not_sent,
        })
    }

    /// Delete an invite in either non-terminal status. No limit interaction.
    pub async fn delete_invite(&self, organization_id: Uuid, invite_id: Uuid) -> AppResult<()> {
        let deleted = InviteRepository::new(&self.db)
            .delete(organization_id, invite_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !deleted {
            return Err(AppError::InviteNotEligible("Invite not found".to_string()));
        }

        info!(organization_id = %organization_id, invite_id = %invite_id, "Invite deleted");
        Ok(())
    }

    pub async fn list_invites(&self, organization_id: Uuid) -> AppResult<Vec<OrganizationInvite>> {
        InviteRepository::new(&self.db)
            .list(organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Normalize and validate a creation payload: well-formed emails, no
    /// email twice in one request, no email with an existing live invite.
    /// Any violation rejects the whole payload before anything is created.
    async fn validate_payloads(
        &self,
        organization_id: Uuid,
        payloads: Vec<InvitePayload>,
    ) -> AppResult<Vec<InvitePayload>> {
        if payloads.is_empty() {
            return Err(AppError::BadRequest("No invites in request".to_string()));
        }

        let mut normalized = Vec::with_capacity(payloads.len());
        let mut seen = std::collections::HashSet::new();
        for mut payload in payloads {
            payload.email = payload.email.trim().to_lowercase();
            payload.validate()?;
            if !seen.insert(payload.email.clone()) {
                return Err(AppError::DuplicateInvite(format!(
                    "Email {} appears more than once in the request",
                    payload.email
                )));
            }
            normalized.push(payload);
        }

        let live = InviteRepository::new(&self.db)
            .live_invites(organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        for payload in &normalized {
            if live.iter().any(|invite| invite.email == payload.email) {
                return Err(AppError::DuplicateInvite(format!(
                    "A live invitation already exists for {}",
                    payload.email
                )));
            }
        }

        Ok(normalized)
    }

    async fn require_organization(&self, organization_id: Uuid) -> AppResult<Organization> {
        OrganizationRepository::new(&self.db)
            .get_by_id(organization_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }

    /// Best-effort notification. Returns whether the email went out; a
    /// failure is logged and reported, never escalated.
    async fn notify(&self, organization: &Organization, invite: &OrganizationInvite) -> bool {
        match self
            .notifier
            .send_invite(&invite.email, organization, &invite.invite_code)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    organization_id = %organization.id,
                    invite_id = %invite.id,
                    email = %invite.email,
                    error = %e,
                    "Invite email failed, invite remains valid"
                );
                false
            }
        }
    }
}

fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}
