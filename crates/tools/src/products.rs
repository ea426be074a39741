//! Product catalogue tools.

use crate::data_client::DataClient;
use async_trait::async_trait;
use clerk_core::error::ToolError;
use clerk_core::tool::{Tool, ToolArgs};
use serde_json::Value;
use std::sync::Arc;

/// Largest `limit` a product search may ask for.
pub const MAX_SEARCH_LIMIT: i64 = 10;

/// Lists the product columns so the model knows what it can sort by.
pub struct ProductColumnsTool {
    client: Arc<DataClient>,
}

impl ProductColumnsTool {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ProductColumnsTool {
    fn name(&self) -> &str {
        "get_product_columns"
    }

    fn description(&self) -> &str {
        "Get the columns of the product data so you know what to sort by."
    }

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, _args: ToolArgs) -> Result<Value, ToolError> {
        let url = self.client.products_url(self.name(), &["columns"])?;
        self.client.get_json(self.name(), url, &[]).await
    }
}

pub struct SearchProductsTool {
    client: Arc<DataClient>,
}

impl SearchProductsTool {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

/// Validated search parameters.
#[derive(Debug, PartialEq)]
struct SearchParams {
    query: String,
    sort_column: String,
    sort_order: String,
    limit: i64,
}

impl SearchParams {
    fn from_args(args: &ToolArgs) -> Result<Self, ToolError> {
        let text = |name: &str| {
            args.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{name}' argument")))
        };

        let query = text("query")?;
        let sort_column = text("sort_column")?;

        let sort_order = text("sort_order")?.to_lowercase();
        if sort_order != "asc" && sort_order != "desc" {
            return Err(ToolError::InvalidArguments(format!(
                "'sort_order' must be 'asc' or 'desc', got '{sort_order}'"
            )));
        }

        let limit = args
            .get("limit")
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::InvalidArguments("'limit' must be an integer".into()))?;
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(ToolError::InvalidArguments(format!(
                "'limit' must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}; ask the user for a smaller number"
            )));
        }

        Ok(Self {
            query,
            sort_column,
            sort_order,
            limit,
        })
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("sort_column", self.sort_column.clone()),
            ("sort_order", self.sort_order.clone()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Search for products. You can specify a query, sort column, sort order, and limit. \
         IMPORTANT! If you can't find what you're looking for, try 2 more times, but with a \
         different query, maybe with less keywords."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                },
                "sort_column": {
                    "type": "string",
                    "description": "The column to sort by."
                },
                "sort_order": {
                    "type": "string",
                    "description": "The order to sort by.",
                    "enum": ["asc", "desc"]
                },
                "limit": {
                    "type": "integer",
                    "description": "The maximum number of results to return. If the user says a number more than 10, mention the limit and ask for a smaller number."
                }
            },
            "required": ["query", "sort_column", "sort_order", "limit"],
            "additionalProperties": false
        }))
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let params = SearchParams::from_args(&args)?;
        let url = self.client.products_url(self.name(), &["search"])?;
        self.client
            .get_json(self.name(), url, &params.to_query())
            .await
    }
}
