pub mod auth;
pub mod entries;
pub mod journals;
pub mod maintenance;
pub mod transfer;

use anyhow::anyhow;
use uuid::Uuid;

pub(crate) fn parse_entry_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| anyhow!("Invalid entry ID: {}", e))
}
