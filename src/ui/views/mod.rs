mod approvals;
mod attendance;
mod history;
mod holidays;
mod invites;
mod onboarding;
mod permissions;
mod profile;
mod team;
mod user_detail;

pub use approvals::{Approvable, ApprovalsView};
pub use attendance::AttendanceView;
pub use history::HistoryView;
pub use holidays::HolidaysView;
pub use invites::InvitesView;
pub use onboarding::OnboardingView;
pub use permissions::PermissionsView;
pub use profile::ProfileView;
pub use team::TeamView;
pub use user_detail::UserDetailView;
