//! Business logic services

pub mod invitation;
pub mod license;
pub mod mailer;
pub mod member_guard;
pub mod plan;

pub use invitation::InvitationService;
pub use license::{LicenseService, LimitCheck, LimitType};
pub use mailer::{InviteNotifier, NoopNotifier, SmtpNotifier};
pub use member_guard::MemberLimitGuard;
pub use plan::{DbPlanProvider, PlanProvider, StaticPlanProvider};
