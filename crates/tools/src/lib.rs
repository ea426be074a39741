//! Order and product tools for Clerk.
//!
//! Every tool validates its arguments before touching the network, then
//! queries the external data service over HTTP.

pub mod data_client;
pub mod orders;
pub mod products;

#[cfg(test)]
mod test_support;

pub use data_client::DataClient;
pub use orders::{AllOrdersTool, CustomerOrdersTool};
pub use products::{ProductColumnsTool, SearchProductsTool};

use clerk_config::DataServiceConfig;
use clerk_core::tool::ToolRegistry;
use std::sync::Arc;

/// Create the registry with every data-service tool.
pub fn default_registry(config: &DataServiceConfig) -> ToolRegistry {
    let client = Arc::new(DataClient::new(config));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(AllOrdersTool::new(client.clone())));
    registry.register(Arc::new(CustomerOrdersTool::new(client.clone())));
    registry.register(Arc::new(ProductColumnsTool::new(client.clone())));
    registry.register(Arc::new(SearchProductsTool::new(client)));
    registry
}
