//! Order lookup tools.

use crate::data_client::DataClient;
use async_trait::async_trait;
use clerk_core::error::ToolError;
use clerk_core::tool::{Tool, ToolArgs};
use serde_json::Value;
use std::sync::Arc;

/// Lists orders; only the first few rows are handed to the model.
pub struct AllOrdersTool {
    client: Arc<DataClient>,
}

impl AllOrdersTool {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AllOrdersTool {
    fn name(&self) -> &str {
        "get_all_orders_data"
    }

    fn description(&self) -> &str {
        "Get all orders data."
    }

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, _args: ToolArgs) -> Result<Value, ToolError> {
        let url = self.client.orders_url(self.name(), &[])?;
        let orders = self.client.get_json(self.name(), url, &[]).await?;
        Ok(self.client.truncate(orders))
    }
}

/// Orders placed by one customer.
pub struct CustomerOrdersTool {
    client: Arc<DataClient>,
}

impl CustomerOrdersTool {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CustomerOrdersTool {
    fn name(&self) -> &str {
        "get_orders_by_customer_id"
    }

    fn description(&self) -> &str {
        "Get orders by customer ID."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "customer_id": {
                    "type": "string",
                    "description": "The customer's ID."
                }
            },
            "required": ["customer_id"],
            "additionalProperties": false
        }))
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        // Models sometimes send numeric ids despite the schema.
        let customer_id = match args.get("customer_id") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ToolError::InvalidArguments(
                    "Missing 'customer_id' argument".into(),
                ));
            }
        };
        if customer_id.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'customer_id' must not be blank".into(),
            ));
        }

        let url = self
            .client
            .orders_url(self.name(), &["customer", &customer_id])?;
        let orders = self.client.get_json(self.name(), url, &[]).await?;
        Ok(self.client.truncate(orders))
    }
}
