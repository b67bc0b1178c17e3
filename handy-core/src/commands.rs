//! One-shot device settings and status queries.

use crate::client::Handy;
use crate::error::Result;
use crate::messages::{
    CommandResponse, HandyMode, ModeResponse, SetSpeedResponse, SetStrokeResponse,
    SettingsResponse, StatusResponse, VersionResponse,
};

impl Handy {
    pub async fn set_mode(&self, mode: HandyMode) -> Result<ModeResponse> {
        self.command("setMode", &[("mode", u8::from(mode).to_string())])
            .await
    }

    pub async fn toggle_mode(&self, mode: HandyMode) -> Result<ModeResponse> {
        self.command("toggleMode", &[("mode", u8::from(mode).to_string())])
            .await
    }

    /// Speed in mm/s when `absolute`, otherwise percent of maximum.
    pub async fn set_speed(&self, speed: f64, absolute: bool) -> Result<SetSpeedResponse> {
        let unit = if absolute { "mm/s" } else { "%" };
        self.command(
            "setSpeed",
            &[("speed", speed.to_string()), ("type", unit.to_string())],
        )
        .await
    }

    pub async fn step_speed(&self, up: bool) -> Result<SetSpeedResponse> {
        self.command("stepSpeed", &[("step", up.to_string())]).await
    }

    /// Stroke length in mm when `absolute`, otherwise percent of maximum.
    pub async fn set_stroke(&self, stroke: f64, absolute: bool) -> Result<SetStrokeResponse> {
        let unit = if absolute { "mm" } else { "%" };
        self.command(
            "setStroke",
            &[("stroke", stroke.to_string()), ("type", unit.to_string())],
        )
        .await
    }

    pub async fn step_stroke(&self, up: bool) -> Result<SetStrokeResponse> {
        self.command("stepStroke", &[("step", up.to_string())]).await
    }

    pub async fn set_stroke_zone(&self, min: f64, max: f64) -> Result<CommandResponse> {
        self.command(
            "setStrokeZone",
            &[("min", min.to_string()), ("max", max.to_string())],
        )
        .await
    }

    pub async fn get_version(&self) -> Result<VersionResponse> {
        self.command("getVersion", &[]).await
    }

    pub async fn get_settings(&self) -> Result<SettingsResponse> {
        self.command("getSettings", &[]).await
    }

    pub async fn get_status(&self) -> Result<StatusResponse> {
        self.command("getStatus", &[]).await
    }
}
