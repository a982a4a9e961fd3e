//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod bug_repo;
pub mod campaign_repo;
pub mod project_repo;
pub mod scenario_repo;
pub mod session_repo;
pub mod stats_repo;
pub mod ticket_repo;
pub mod user_repo;
pub mod version_repo;

pub use bug_repo::BugRepo;
pub use campaign_repo::CampaignRepo;
pub use project_repo::ProjectRepo;
pub use scenario_repo::ScenarioRepo;
pub use session_repo::SessionRepo;
pub use stats_repo::StatsRepo;
pub use ticket_repo::TicketRepo;
pub use user_repo::UserRepo;
pub use version_repo::VersionRepo;
