use crate::app_state::PlaybackState;

/// Sync commands that move the simulated playback position.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    Prepare {
        script_url: String,
        name: Option<String>,
    },
    Play {
        play: bool,
        server_time: f64,
        time_ms: f64,
    },
    Adjust {
        current_time_ms: f64,
        server_time: f64,
        filter: f64,
    },
    Offset {
        offset_ms: i64,
    },
}

// Core logic shared by all sync endpoints
pub fn process_sync_command(playback: &mut PlaybackState, cmd: SyncCommand) {
    match cmd {
        SyncCommand::Prepare { script_url, name } => {
            *playback = PlaybackState {
                script_url: Some(script_url),
                script_name: name,
                sync_offset_ms: playback.sync_offset_ms,
                ..PlaybackState::default()
            };
        }
        SyncCommand::Play {
            play,
            server_time,
            time_ms,
        } => {
            // Media time `time_ms` lines up with server clock `server_time`.
            playback.position_ms = time_ms;
            playback.last_update_time = server_time;
            playback.is_playing = play;
        }
        SyncCommand::Adjust {
            current_time_ms,
            server_time,
            filter,
        } => {
            // Blend the reported position into our own belief.
            let believed = playback.position_at(server_time);
            playback.position_ms = believed + filter * (current_time_ms - believed);
            playback.last_update_time = server_time;
            playback.adjustments += 1;
        }
        SyncCommand::Offset { offset_ms } => {
            playback.sync_offset_ms = offset_ms;
        }
    }
}
