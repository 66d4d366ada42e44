//! Stylist context built from a calendar event.

use serde::Deserialize;

/// A calendar event, optionally annotated with the weather at its location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventContext {
    pub summary: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weather: Option<String>,
}

impl EventContext {
    /// Render the free-text context passed to the stylist flow.
    ///
    /// The weather note only appears when both a location and a weather
    /// report are present.
    pub fn render(&self) -> String {
        let weather = match &self.weather {
            Some(w) if !self.location.is_empty() => {
                format!(" [Weather at {}: {}]", self.location, w)
            }
            _ => String::new(),
        };
        format!(
            "Event: {} at {}. Location: {}{}. Description: {}",
            self.summary, self.start, self.location, weather, self.description
        )
    }
}
