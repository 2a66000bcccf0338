use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_DROP_FRUIT_VALUE, DEFAULT_INITIAL_SCORE, DEFAULT_LOSS_ON_COLLISION,
    DEFAULT_MAX_COLLISION_DISTANCE, DEFAULT_PIXELS_PER_FIELD, DEFAULT_SCREEN_HEIGHT,
    DEFAULT_SCREEN_WIDTH,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse_key(value: &str) -> Option<Self> {
        match value {
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            "ArrowLeft" => Some(Self::Left),
            "ArrowRight" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Up => "ArrowUp",
            Self::Down => "ArrowDown",
            Self::Left => "ArrowLeft",
            Self::Right => "ArrowRight",
        }
    }

    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screen {
    pub width: i32,
    pub height: i32,
    /// Render hint for clients; the engine never reads it.
    #[serde(rename = "pixelsPerFields")]
    pub pixels_per_field: i32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
            pixels_per_field: DEFAULT_PIXELS_PER_FIELD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    #[serde(rename = "maxCollisionDistance")]
    pub max_collision_distance: i32,
    /// Points taken from each side of a player collision.
    #[serde(rename = "lossOnCollision", alias = "shockCost")]
    pub loss_on_collision: i32,
    #[serde(rename = "initialScore")]
    pub initial_score: i32,
    #[serde(rename = "autoDropFruitValue")]
    pub auto_drop_fruit_value: i32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_collision_distance: DEFAULT_MAX_COLLISION_DISTANCE,
            loss_on_collision: DEFAULT_LOSS_ON_COLLISION,
            initial_score: DEFAULT_INITIAL_SCORE,
            auto_drop_fruit_value: DEFAULT_AUTO_DROP_FRUIT_VALUE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    #[serde(rename = "playerId")]
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub score: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitView {
    #[serde(rename = "fruitId")]
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub quantity: i32,
}

/// Partial fruit placement. Every missing field is filled by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FruitDrop {
    #[serde(rename = "fruitId", default)]
    pub fruit_id: Option<String>,
    #[serde(rename = "fruitX", default)]
    pub x: Option<i32>,
    #[serde(rename = "fruitY", default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub quantity: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "keyPressed")]
    pub key_pressed: String,
}

/// Shallow state merge. Each present key replaces the engine's value as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StatePatch {
    #[serde(default)]
    pub players: Option<Vec<PlayerView>>,
    #[serde(default)]
    pub fruits: Option<Vec<FruitView>>,
    #[serde(default)]
    pub screen: Option<Screen>,
    #[serde(default)]
    pub config: Option<ArenaConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArenaState {
    pub players: Vec<PlayerView>,
    pub fruits: Vec<FruitView>,
    pub screen: Screen,
    pub config: ArenaConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ArenaCommand {
    AddPlayer {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "playerX", default)]
        x: Option<i32>,
        #[serde(rename = "playerY", default)]
        y: Option<i32>,
    },
    RemovePlayer {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    AddFruit(FruitDrop),
    RemoveFruit {
        #[serde(rename = "fruitId")]
        fruit_id: String,
    },
    MovePlayer(MoveCommand),
    SetState {
        state: StatePatch,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ArenaEvent {
    AddPlayer {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "playerX")]
        x: i32,
        #[serde(rename = "playerY")]
        y: i32,
        score: i32,
    },
    RemovePlayer {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    AddFruit {
        #[serde(rename = "fruitId")]
        fruit_id: String,
        #[serde(rename = "fruitX")]
        x: i32,
        #[serde(rename = "fruitY")]
        y: i32,
        quantity: i32,
    },
    RemoveFruit {
        #[serde(rename = "fruitId")]
        fruit_id: String,
    },
    /// Verbatim re-broadcast of an incoming move, sent before it is applied.
    MovePlayer(MoveCommand),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    #[serde(rename = "otherId")]
    pub other_id: String,
    #[serde(rename = "discountOther")]
    pub discount_other: i32,
    #[serde(rename = "discountSelf")]
    pub discount_self: i32,
    #[serde(rename = "totalFruits")]
    pub total_fruits: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "fruitCollected")]
    pub fruit_collected: i32,
    pub collisions: Vec<CollisionReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_arrow_keys_only() {
        assert_eq!(Direction::parse_key("ArrowUp"), Some(Direction::Up));
        assert_eq!(Direction::parse_key("ArrowLeft"), Some(Direction::Left));
        assert_eq!(Direction::parse_key("arrowup"), None);
        assert_eq!(Direction::parse_key("w"), None);
        for dir in Direction::ALL {
            assert_eq!(Direction::parse_key(dir.key()), Some(dir));
        }
    }

    #[test]
    fn events_serialize_as_flat_records() {
        let event = ArenaEvent::AddPlayer {
            player_id: "a".to_string(),
            x: 1,
            y: 2,
            score: 50,
        };
        let value = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "type": "add-player",
                "playerId": "a",
                "playerX": 1,
                "playerY": 2,
                "score": 50,
            })
        );

        let moved = ArenaEvent::MovePlayer(MoveCommand {
            player_id: "a".to_string(),
            key_pressed: "KeyQ".to_string(),
        });
        let value = serde_json::to_value(&moved).expect("event should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "type": "move-player",
                "playerId": "a",
                "keyPressed": "KeyQ",
            })
        );
    }

    #[test]
    fn commands_deserialize_with_optional_fields() {
        let parsed: ArenaCommand = serde_json::from_str(r#"{"type":"add-fruit"}"#)
            .expect("bare add-fruit should parse");
        assert_eq!(parsed, ArenaCommand::AddFruit(FruitDrop::default()));

        let parsed: ArenaCommand =
            serde_json::from_str(r#"{"type":"add-player","playerId":"p","playerX":3}"#)
                .expect("add-player should parse");
        assert_eq!(
            parsed,
            ArenaCommand::AddPlayer {
                player_id: "p".to_string(),
                x: Some(3),
                y: None,
            }
        );
    }

    #[test]
    fn config_accepts_shock_cost_alias_and_defaults() {
        let config: ArenaConfig =
            serde_json::from_str(r#"{"shockCost":7}"#).expect("config should parse");
        assert_eq!(config.loss_on_collision, 7);
        assert_eq!(config.initial_score, DEFAULT_INITIAL_SCORE);
        assert_eq!(config.max_collision_distance, DEFAULT_MAX_COLLISION_DISTANCE);
    }
}
