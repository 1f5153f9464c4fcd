//! Default value functions referenced by the serde derives.

pub fn default_port() -> u16 {
    3537
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// server defaults

pub fn default_max_message_size() -> usize {
    64 * 1024
}

pub fn default_gc_interval_secs() -> u64 {
    300
}

pub fn default_min_lobby_lifespan_secs() -> u64 {
    5 * 60
}

pub fn default_max_lobby_lifespan_secs() -> u64 {
    6 * 60 * 60
}

pub fn default_join_code_min_len() -> usize {
    crate::protocol::MIN_CODE_LENGTH
}

// game defaults

pub fn default_round_duration_secs() -> f64 {
    10.0
}

pub fn default_round_grace_secs() -> f64 {
    default_round_duration_secs() / 5.0
}

pub fn default_pre_game_duration_secs() -> f64 {
    5.0
}

pub fn default_player_reconnect_secs() -> f64 {
    10.0
}

pub fn default_duration_per_event_secs() -> f64 {
    5.0
}

pub fn default_pieces_per_player() -> u32 {
    3
}

// logging defaults

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_log_rotation() -> String {
    "daily".to_string()
}
