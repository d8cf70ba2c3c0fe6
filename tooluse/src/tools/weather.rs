//! Canned location and weather lookups.
//!
//! These answer with fixed strings so a run is reproducible without any
//! external service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::tool::{ToolResult, TypedTool};

/// Answer for any place without a canned forecast.
pub const SUNNY_DAY: &str = "It's a normal sunny day~";

/// Reported by [`CurrentLocation`].
pub const CURRENT_LOCATION: &str = "Guangzhou";

/// Looks up coordinates for a place name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatLong;

/// Arguments for [`LatLong`].
#[derive(Debug, Clone, Deserialize)]
pub struct LatLongArgs {
    /// Place to locate.
    pub place: String,
}

#[async_trait]
impl TypedTool for LatLong {
    const NAME: &'static str = "get_lat_long";
    type Args = LatLongArgs;
    type Output = String;

    fn description(&self) -> String {
        "Get the latitude and longitude of the location.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "place": {"type": "string", "description": "The location that needs to obtain longitude and latitude."}
            },
            "required": ["place"]
        })
    }

    async fn call(&self, args: Self::Args) -> ToolResult<Self::Output> {
        info!(place = %args.place, "get_lat_long");
        Ok(format!(
            "Location: {} latitude: 31.411578687640844, longitude: 121.49308204650879",
            args.place
        ))
    }
}

/// Weather by coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherAt;

/// Arguments for [`WeatherAt`]. Coordinates may arrive as strings or numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherAtArgs {
    /// Degrees north of the equator.
    pub latitude: Value,
    /// Degrees east of Greenwich.
    pub longitude: Value,
}

#[async_trait]
impl TypedTool for WeatherAt {
    const NAME: &'static str = "get_weather";
    type Args = WeatherAtArgs;
    type Output = String;

    fn description(&self) -> String {
        "Get local weather information based on longitude and latitude.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "string", "description": "The angular distance north or south from the earth's equator, in degrees."},
                "longitude": {"type": "string", "description": "The east-west position of a point on the Earth's surface, in degrees."}
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn call(&self, args: Self::Args) -> ToolResult<Self::Output> {
        info!(latitude = %args.latitude, longitude = %args.longitude, "get_weather");
        Ok(SUNNY_DAY.to_owned())
    }
}

/// Reports where the user is.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentLocation;

#[async_trait]
impl TypedTool for CurrentLocation {
    const NAME: &'static str = "get_current_location";
    type Args = serde::de::IgnoredAny;
    type Output = String;

    fn description(&self) -> String {
        "Use this tool to get the current location if user does not provide a location".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _args: Self::Args) -> ToolResult<Self::Output> {
        info!("get_current_location");
        Ok(CURRENT_LOCATION.to_owned())
    }
}

/// Weather by city name.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentWeather;

/// Arguments for [`CurrentWeather`].
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherArgs {
    /// City or region.
    pub location: String,
    /// `celsius` or `fahrenheit`; ignored by the canned answers.
    #[serde(default)]
    pub unit: Option<String>,
}

#[async_trait]
impl TypedTool for CurrentWeather {
    const NAME: &'static str = "get_current_weather";
    type Args = CurrentWeatherArgs;
    type Output = String;

    fn description(&self) -> String {
        "Get the current weather in a given location".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city or region which is required to fetch weather information."
                },
                "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
            },
            "required": ["location"]
        })
    }

    async fn call(&self, args: Self::Args) -> ToolResult<Self::Output> {
        info!(location = %args.location, unit = ?args.unit, "get_current_weather");
        let answer = match args.location.as_str() {
            "Guangzhou" => "Guangzhou: Sunny at 25 degrees Celsius.",
            "Beijing" => " Beijing: Rainy at 30 degrees",
            _ => SUNNY_DAY,
        };
        Ok(answer.to_owned())
    }
}
