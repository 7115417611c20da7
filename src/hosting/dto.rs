use crate::game::Stone;
use serde::Deserialize;
use serde::Serialize;

/// POST /get-move request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub board: Vec<Vec<Option<Stone>>>,
    pub player: Stone,
    #[serde(default)]
    pub moves: Option<Vec<[i64; 2]>>,
    #[serde(default)]
    pub turn_ends_at: Option<u64>,
    #[serde(default)]
    pub time_left_ms: Option<u64>,
    #[serde(default)]
    pub turn_limit_ms: Option<u64>,
    #[serde(default)]
    pub force_think_time_ms: Option<u64>,
}

/// POST /get-move response body
#[derive(Debug, Clone, Serialize)]
pub struct MoveResponse {
    pub r#move: [i32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// GET /health response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /swap2/* request body
#[derive(Debug, Clone, Deserialize)]
pub struct Swap2Request {
    #[serde(default)]
    pub board: Option<Vec<Vec<Option<Stone>>>>,
}

/// POST /swap2/propose and /swap2/second response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap2Response {
    pub board: Vec<Vec<Option<Stone>>>,
    pub to_move: Stone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_colors: Option<bool>,
}
