//! Built-in demo tools.
//!
//! - [`PairwiseArithmetic`]: `do_pairwise_arithmetic`
//! - [`LatLong`]: `get_lat_long`
//! - [`WeatherAt`]: `get_weather`
//! - [`CurrentLocation`]: `get_current_location`
//! - [`CurrentWeather`]: `get_current_weather`
//!
//! The toolset functions bundle them the way the two bundled scenarios use
//! them.

mod arithmetic;
mod weather;

pub use arithmetic::{ArithmeticArgs, Operand, PairwiseArithmetic};
pub use weather::{
    CURRENT_LOCATION, CurrentLocation, CurrentWeather, CurrentWeatherArgs, LatLong, LatLongArgs,
    SUNNY_DAY, WeatherAt, WeatherAtArgs,
};

use crate::tool::ToolRegistry;

/// Names accepted by [`toolset`].
pub const TOOLSET_NAMES: [&str; 4] = ["arithmetic", "weather", "location-weather", "full"];

/// Arithmetic plus coordinate-based weather.
#[must_use]
pub fn arithmetic_toolset() -> ToolRegistry {
    ToolRegistry::new()
        .with(PairwiseArithmetic)
        .with(WeatherAt)
        .with(LatLong)
}

/// Coordinate-based weather only.
#[must_use]
pub fn weather_toolset() -> ToolRegistry {
    ToolRegistry::new().with(WeatherAt).with(LatLong)
}

/// Current location and city weather.
#[must_use]
pub fn location_weather_toolset() -> ToolRegistry {
    ToolRegistry::new()
        .with(CurrentWeather)
        .with(CurrentLocation)
}

/// Every demo tool.
#[must_use]
pub fn full_toolset() -> ToolRegistry {
    ToolRegistry::new()
        .with(PairwiseArithmetic)
        .with(WeatherAt)
        .with(LatLong)
        .with(CurrentWeather)
        .with(CurrentLocation)
}

/// Look up a toolset by name.
#[must_use]
pub fn toolset(name: &str) -> Option<ToolRegistry> {
    match name {
        "arithmetic" => Some(arithmetic_toolset()),
        "weather" => Some(weather_toolset()),
        "location-weather" | "location_weather" => Some(location_weather_toolset()),
        "full" => Some(full_toolset()),
        _ => None,
    }
}
