use azops_core::ChainError;

use super::resource::ResourceList;
use crate::{CatalogDefaults, LOG_ANALYTICS_WORKSPACES};

/// `azops monitor workspace list`
///
/// # Errors
///
/// Returns [`ChainError`] if the argument chain is inconsistent.
pub fn workspace_list(defaults: &CatalogDefaults) -> Result<ResourceList, ChainError> {
    ResourceList::new(
        defaults,
        "list",
        "List Log Analytics workspaces in a subscription, optionally filtered by resource group.",
        LOG_ANALYTICS_WORKSPACES,
        "workspaces",
    )
}
