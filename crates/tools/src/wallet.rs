//! Wallet executor: deterministic stand-in for a wallet service.
//!
//! The `action` parameter selects the operation: balance, history, or
//! prepare_transfer. A real deployment would call a node or exchange API;
//! the stand-in returns shaped JSON so the loop can be exercised.

use async_trait::async_trait;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct WalletTool;

fn str_param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

#[async_trait]
impl ToolExecutor for WalletTool {
    fn name(&self) -> ToolName {
        ToolName::ManageWallet
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let action = str_param(params, "action")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'action' argument".into()))?;

        let address = str_param(params, "address").unwrap_or("default");

        let payload = match action {
            "balance" => serde_json::json!({
                "address": address,
                "balance_eth": "1.2500",
                "balance_usd": "4125.00",
            }),
            "history" => serde_json::json!({
                "address": address,
                "transactions": [
                    {"hash": "0xa1", "direction": "in", "amount_eth": "0.5000"},
                    {"hash": "0xb2", "direction": "out", "amount_eth": "0.1200"},
                ],
            }),
            "prepare_transfer" => {
                let to = str_param(params, "to").ok_or_else(|| {
                    ToolError::InvalidArguments("Missing 'to' argument".into())
                })?;
                let amount = str_param(params, "amount")
                    .map(String::from)
                    .or_else(|| params.get("amount").map(|v| v.to_string()))
                    .ok_or_else(|| {
                        ToolError::InvalidArguments("Missing 'amount' argument".into())
                    })?;
                serde_json::json!({
                    "status": "prepared",
                    "to": to,
                    "amount": amount,
                    "note": "Transfer prepared, awaiting user confirmation",
                })
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown wallet action: {other}"
                )));
            }
        };

        Ok(payload.to_string())
    }
}
