//! The serializable form of a whole manager.

use serde::{Deserialize, Serialize};
use tollgate_types::ManagerId;

use crate::{ManagerConfig, SessionInfo};

/// Everything needed to rebuild a manager: its id, config and sessions.
///
/// Lockout timers are not part of a snapshot. Sessions that were locked
/// when the snapshot was taken come back locked and get a fresh, full
/// lockout when the restored manager starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub manager_id: ManagerId,
    pub config: ManagerConfig,
    pub sessions: Vec<SessionInfo>,
}
