//! Weather executor: deterministic stand-in for a weather API.
//!
//! Returns a shaped JSON payload keyed by city so end-to-end tests have a
//! stable observation to assert on.

use async_trait::async_trait;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct GetWeatherTool;

#[async_trait]
impl ToolExecutor for GetWeatherTool {
    fn name(&self) -> ToolName {
        ToolName::GetWeather
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let city = params
            .get("city")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        // Stable pseudo-conditions derived from the city name
        let seed: u32 = city.bytes().map(u32::from).sum();
        let temp_c = 8 + (seed % 20) as i32;
        let conditions = ["clear", "partly cloudy", "overcast", "light rain"]
            [(seed % 4) as usize];

        let payload = serde_json::json!({
            "city": city,
            "temperature_c": temp_c,
            "conditions": conditions,
            "humidity_pct": 40 + (seed % 50),
        });

        Ok(payload.to_string())
    }
}
