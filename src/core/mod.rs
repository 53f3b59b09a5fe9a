pub mod directory;
pub mod discovery;
pub mod membership;
pub mod my_groups;
pub mod pagination;
pub mod query;

pub use crate::domain::model::{DiscoveredGroup, GroupRows, PageEnvelope, StudyGroup};
pub use crate::domain::ports::{AuthClient, Backend, GroupStore};
pub use crate::utils::error::Result;
pub use directory::{DirectorySettings, GroupDirectory};
pub use query::GroupQuery;
