pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{memory::InMemoryBackend, rest::RestBackend};
pub use config::AppConfig;
pub use core::{DirectorySettings, GroupDirectory};
pub use domain::model::{
    DiscoveredGroup, GroupId, Identity, Membership, MembershipStatus, PageEnvelope, StudyGroup,
    UserId,
};
pub use utils::error::{GroupsError, Result};
