use gatekeeper_contract::ToolDescriptor;
use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_core::types::RoleTag;

use crate::store::DealStore;

pub struct AppState {
    pub config: ToolServerConfig,
    pub store: DealStore,
    pub descriptors: Vec<ToolDescriptor>,
}

impl AppState {
    /// True if any of `roles` is in the configured unmasked set for this
    /// backend (spec §4.4 step 7).
    pub fn unmasked(&self, roles: &[RoleTag]) -> bool {
        roles
            .iter()
            .any(|r| self.config.unmasked_roles.iter().any(|u| u == r.as_str()))
    }
}
