use crate::game::Board;
use crate::game::Stone;
use serde::Deserialize;
use serde::Serialize;

/// one training sample: the position, both policy targets, the teacher
/// value, and the final game outcome from the sample's perspective.
/// serialized as one JSON object per line in the replay buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub state: Vec<Vec<Option<Stone>>>,
    pub player: Stone,
    pub mcts_policy: Vec<f32>,
    pub teacher_policy: Vec<f32>,
    pub teacher_value: f32,
    pub final_value: i8,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub source: String,
    pub game_id: String,
    pub move_index: usize,
    pub total_moves: usize,
    pub result: i8,
    pub tags: Vec<String>,
    pub extra: serde_json::Value,
}

impl Sample {
    pub fn board(&self) -> Option<Board> {
        Board::from_rows(&self.state)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
