use azops_core::ChainError;

use super::resource::ResourceList;
use crate::{APP_CONFIGURATION_STORES, CatalogDefaults};

/// `azops appconfig account list`
///
/// # Errors
///
/// Returns [`ChainError`] if the argument chain is inconsistent.
pub fn account_list(defaults: &CatalogDefaults) -> Result<ResourceList, ChainError> {
    ResourceList::new(
        defaults,
        "list",
        "List App Configuration stores in a subscription, optionally filtered by resource group.",
        APP_CONFIGURATION_STORES,
        "accounts",
    )
}
