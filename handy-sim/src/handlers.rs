use crate::app_state::{DeviceState, SharedState};
use crate::control::{process_sync_command, SyncCommand};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use handy_core::messages::{
    CommandResponse, HandyMode, ModeResponse, SetSpeedResponse, SetStrokeResponse,
    SettingsResponse, StatusResponse, SyncOffsetResponse, SyncPlayResponse, SyncPrepareResponse,
    VersionResponse,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::Ordering;

type Params = HashMap<String, String>;
type Reply = (StatusCode, Json<Value>);

const SPEED_STEP: f64 = 10.0;
const STROKE_STEP: f64 = 10.0;

pub async fn command_handler(
    State(state): State<SharedState>,
    Path((key, command)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> impl IntoResponse {
    tracing::debug!("{} {} {:?}", key, command, params);

    if command == "getServerTime" {
        state.time_requests.fetch_add(1, Ordering::Relaxed);
        return ok(json!({ "serverTime": state.server_time().round() as i64 }));
    }

    let Some(device) = state.device(&key) else {
        tracing::info!("Command {} for unknown machine {}", command, key);
        return error(StatusCode::OK, false, "machine not connected");
    };

    let mut guard = match device.state.write() {
        Ok(guard) => guard,
        Err(_) => return error(StatusCode::INTERNAL_SERVER_ERROR, true, "device state poisoned"),
    };

    match handle_command(&mut guard, &command, &params, state.server_time()) {
        Ok(reply) => reply,
        Err(message) => {
            tracing::info!("{} rejected for {}: {}", command, key, message);
            error(StatusCode::OK, true, &message)
        }
    }
}

fn handle_command(
    device: &mut DeviceState,
    command: &str,
    params: &Params,
    server_now: f64,
) -> Result<Reply, String> {
    let response = match command {
        "setMode" => {
            device.mode = mode_param(params)?;
            reply(ModeResponse {
                connected: true,
                mode: Some(device.mode),
            })
        }
        "toggleMode" => {
            let mode = mode_param(params)?;
            device.mode = if device.mode == mode {
                HandyMode::Off
            } else {
                mode
            };
            reply(ModeResponse {
                connected: true,
                mode: Some(device.mode),
            })
        }
        "setSpeed" => {
            device.speed = number_param(params, "speed")?;
            reply(SetSpeedResponse {
                connected: true,
                speed: Some(device.speed),
            })
        }
        "stepSpeed" => {
            let step = if bool_param(params, "step")? {
                SPEED_STEP
            } else {
                -SPEED_STEP
            };
            device.speed = (device.speed + step).clamp(0.0, 100.0);
            reply(SetSpeedResponse {
                connected: true,
                speed: Some(device.speed),
            })
        }
        "setStroke" => {
            device.stroke = number_param(params, "stroke")?;
            reply(SetStrokeResponse {
                connected: true,
                stroke: Some(device.stroke),
            })
        }
        "stepStroke" => {
            let step = if bool_param(params, "step")? {
                STROKE_STEP
            } else {
                -STROKE_STEP
            };
            device.stroke = (device.stroke + step).clamp(0.0, 100.0);
            reply(SetStrokeResponse {
                connected: true,
                stroke: Some(device.stroke),
            })
        }
        "setStrokeZone" => {
            let min = number_param(params, "min")?;
            let max = number_param(params, "max")?;
            if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) || min > max {
                return Err(format!("invalid stroke zone {min}..{max}"));
            }
            device.stroke_zone = (min, max);
            reply(CommandResponse {
                connected: true,
                success: Some(true),
            })
        }
        "getVersion" => reply(VersionResponse {
            connected: true,
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            latest: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        "getSettings" => reply(SettingsResponse {
            connected: true,
            mode: Some(device.mode),
            position: Some(device.playback.position_at(server_now)),
            speed: Some(device.speed),
            stroke: Some(device.stroke),
        }),
        "getStatus" => reply(StatusResponse {
            connected: true,
            mode: Some(device.mode),
        }),
        "syncPrepare" => {
            let script_url = params
                .get("url")
                .filter(|u| !u.is_empty())
                .ok_or("missing url")?
                .clone();
            number_param(params, "timeout")?;
            process_sync_command(
                &mut device.playback,
                SyncCommand::Prepare {
                    script_url,
                    name: params.get("name").cloned(),
                },
            );
            device.mode = HandyMode::Sync;
            reply(SyncPrepareResponse {
                connected: true,
                success: Some(true),
                downloaded: Some(true),
            })
        }
        "syncPlay" => {
            if device.playback.script_url.is_none() {
                return Err("no script prepared".to_string());
            }
            let play = bool_param(params, "play")?;
            process_sync_command(
                &mut device.playback,
                SyncCommand::Play {
                    play,
                    server_time: number_param(params, "serverTime")?,
                    time_ms: number_param(params, "time")?,
                },
            );
            reply(SyncPlayResponse {
                connected: true,
                success: Some(true),
                playing: Some(play),
            })
        }
        "syncOffset" => {
            let offset_ms = params
                .get("offset")
                .and_then(|o| o.parse::<i64>().ok())
                .ok_or("invalid offset")?;
            process_sync_command(&mut device.playback, SyncCommand::Offset { offset_ms });
            reply(SyncOffsetResponse {
                connected: true,
                success: Some(true),
                offset: Some(offset_ms as f64),
            })
        }
        "syncAdjustTimestamp" => {
            if device.playback.script_url.is_none() {
                return Err("no script prepared".to_string());
            }
            let filter = number_param(params, "filter")?;
            if !(filter > 0.0 && filter <= 1.0) {
                return Err(format!("filter out of range: {filter}"));
            }
            process_sync_command(
                &mut device.playback,
                SyncCommand::Adjust {
                    current_time_ms: number_param(params, "currentTime")?,
                    server_time: number_param(params, "serverTime")?,
                    filter,
                },
            );
            reply(CommandResponse {
                connected: true,
                success: Some(true),
            })
        }
        other => {
            return Ok(error(
                StatusCode::NOT_FOUND,
                true,
                &format!("unknown command {other}"),
            ))
        }
    };

    Ok(response)
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn reply<T: Serialize>(response: T) -> Reply {
    match serde_json::to_value(response) {
        Ok(body) => ok(body),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, true, &e.to_string()),
    }
}

fn error(status: StatusCode, connected: bool, message: &str) -> Reply {
    (
        status,
        Json(json!({ "connected": connected, "error": message })),
    )
}

fn number_param(params: &Params, name: &str) -> Result<f64, String> {
    params
        .get(name)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {name}"))
}

fn bool_param(params: &Params, name: &str) -> Result<bool, String> {
    match params.get(name).map(String::as_str) {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(format!("invalid {name}")),
    }
}

fn mode_param(params: &Params) -> Result<HandyMode, String> {
    params
        .get("mode")
        .and_then(|m| m.parse::<u8>().ok())
        .ok_or_else(|| "invalid mode".to_string())
        .and_then(HandyMode::try_from)
}
