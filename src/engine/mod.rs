use std::fmt;

use tracing::{debug, info};

use crate::config::ArenaSettings;
use crate::error::CommandError;
use crate::rng::ArenaRng;
use crate::types::{
    ArenaCommand, ArenaConfig, ArenaEvent, ArenaState, Direction, FruitDrop, FruitView,
    MoveCommand, MoveReport, PlayerView, Screen, StatePatch,
};

mod collision_system;
mod utils;

pub use self::utils::fruit_key;
use self::utils::{offset, wrap};

/// Receives every engine event, synchronously and in registration order.
pub trait EventSink: Send {
    fn notify(&mut self, event: &ArenaEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&ArenaEvent) + Send,
{
    fn notify(&mut self, event: &ArenaEvent) {
        self(event)
    }
}

pub struct ArenaEngine {
    screen: Screen,
    config: ArenaConfig,
    rng: ArenaRng,
    players: Vec<PlayerView>,
    fruits: Vec<FruitView>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl fmt::Debug for ArenaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaEngine")
            .field("screen", &self.screen)
            .field("config", &self.config)
            .field("players", &self.players)
            .field("fruits", &self.fruits)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl ArenaEngine {
    pub fn new(settings: ArenaSettings, rng: ArenaRng) -> Self {
        Self {
            screen: settings.screen,
            config: settings.config,
            rng,
            players: Vec::new(),
            fruits: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn with_seed(settings: ArenaSettings, seed: u64) -> Self {
        Self::new(settings, ArenaRng::new(seed))
    }

    pub fn subscribe<S>(&mut self, sink: S)
    where
        S: EventSink + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    pub fn state(&self) -> ArenaState {
        ArenaState {
            players: self.players.clone(),
            fruits: self.fruits.clone(),
            screen: self.screen,
            config: self.config,
        }
    }

    /// Replaces every top-level key present in `patch`. Nothing is validated.
    pub fn set_state(&mut self, patch: StatePatch) {
        if let Some(players) = patch.players {
            self.players = players;
        }
        if let Some(fruits) = patch.fruits {
            self.fruits = fruits;
        }
        if let Some(screen) = patch.screen {
            self.screen = screen;
        }
        if let Some(config) = patch.config {
            self.config = config;
        }
    }

    pub fn player(&self, player_id: &str) -> Option<PlayerView> {
        self.player_index(player_id)
            .map(|idx| self.players[idx].clone())
    }

    pub fn fruit(&self, fruit_id: &str) -> Option<FruitView> {
        self.fruits
            .iter()
            .find(|fruit| fruit.id == fruit_id)
            .cloned()
    }

    pub fn fruit_at(&self, x: i32, y: i32) -> Option<FruitView> {
        self.fruits
            .iter()
            .find(|fruit| fruit.x == x && fruit.y == y)
            .cloned()
    }

    pub fn require_player(&self, player_id: &str) -> Result<PlayerView, CommandError> {
        self.player(player_id)
            .ok_or_else(|| CommandError::UnknownPlayer(player_id.to_string()))
    }

    pub fn require_fruit(&self, fruit_id: &str) -> Result<FruitView, CommandError> {
        self.fruit(fruit_id)
            .ok_or_else(|| CommandError::UnknownFruit(fruit_id.to_string()))
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn total_score(&self) -> i64 {
        self.players.iter().map(|player| player.score as i64).sum()
    }

    pub fn total_fruit_value(&self) -> i64 {
        self.fruits.iter().map(|fruit| fruit.quantity as i64).sum()
    }

    pub fn apply(&mut self, command: ArenaCommand) -> Result<(), CommandError> {
        match command {
            ArenaCommand::AddPlayer { player_id, x, y } => {
                self.add_player(&player_id, x, y);
            }
            ArenaCommand::RemovePlayer { player_id } => {
                self.remove_player(&player_id);
            }
            ArenaCommand::AddFruit(drop) => {
                self.add_fruit(drop);
            }
            ArenaCommand::RemoveFruit { fruit_id } => {
                self.remove_fruit(&fruit_id);
            }
            ArenaCommand::MovePlayer(command) => {
                self.move_player(command)?;
            }
            ArenaCommand::SetState { state } => self.set_state(state),
        }
        Ok(())
    }

    /// Inserts or overwrites `player_id`. Missing coordinates are drawn at random.
    pub fn add_player(&mut self, player_id: &str, x: Option<i32>, y: Option<i32>) -> PlayerView {
        let x = match x {
            Some(x) => wrap(self.screen.width, x),
            None => self.rng.below(self.screen.width),
        };
        let y = match y {
            Some(y) => wrap(self.screen.height, y),
            None => self.rng.below(self.screen.height),
        };
        let player = PlayerView {
            id: player_id.to_string(),
            x,
            y,
            score: self.config.initial_score,
        };

        match self.player_index(player_id) {
            Some(idx) => self.players[idx] = player.clone(),
            None => self.players.push(player.clone()),
        }
        info!(player_id, x, y, score = player.score, "player added");

        self.notify_all(ArenaEvent::AddPlayer {
            player_id: player.id.clone(),
            x,
            y,
            score: player.score,
        });
        player
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<PlayerView> {
        let removed = self
            .player_index(player_id)
            .map(|idx| self.players.remove(idx));
        if removed.is_some() {
            info!(player_id, "player removed");
        }
        self.notify_all(ArenaEvent::RemovePlayer {
            player_id: player_id.to_string(),
        });
        removed
    }

    /// Auto-drop: random cell, `autoDropFruitValue` points.
    pub fn add_random_fruit(&mut self) -> Option<FruitView> {
        self.add_fruit(FruitDrop::default())
    }

    /// Drops fruit on a cell, stacking onto any fruit already there. The id is
    /// always the cell key, whatever the caller passed in `fruit_id`.
    pub fn add_fruit(&mut self, drop: FruitDrop) -> Option<FruitView> {
        let quantity = drop
            .quantity
            .unwrap_or(self.config.auto_drop_fruit_value);
        if quantity < 1 {
            debug!(quantity, "ignored fruit drop without value");
            return None;
        }
        let x = match drop.x {
            Some(x) => wrap(self.screen.width, x),
            None => self.rng.below(self.screen.width),
        };
        let y = match drop.y {
            Some(y) => wrap(self.screen.height, y),
            None => self.rng.below(self.screen.height),
        };
        let id = fruit_key(x, y);
        if let Some(requested) = drop.fruit_id.as_deref() {
            if requested != id {
                debug!(requested, fruit_id = %id, "fruit id normalized to cell key");
            }
        }

        let fruit = match self.fruits.iter_mut().find(|fruit| fruit.id == id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
                existing.clone()
            }
            None => {
                let fruit = FruitView {
                    id,
                    x,
                    y,
                    quantity,
                };
                self.fruits.push(fruit.clone());
                fruit
            }
        };

        self.notify_all(ArenaEvent::AddFruit {
            fruit_id: fruit.id.clone(),
            x: fruit.x,
            y: fruit.y,
            quantity: fruit.quantity,
        });
        Some(fruit)
    }

    pub fn remove_fruit(&mut self, fruit_id: &str) -> Option<FruitView> {
        let removed = self
            .fruits
            .iter()
            .position(|fruit| fruit.id == fruit_id)
            .map(|idx| self.fruits.remove(idx));
        self.notify_all(ArenaEvent::RemoveFruit {
            fruit_id: fruit_id.to_string(),
        });
        removed
    }

    /// Broadcasts the raw command first, then moves one wrapped cell and
    /// resolves fruit pickups followed by player collisions.
    pub fn move_player(&mut self, command: MoveCommand) -> Result<MoveReport, CommandError> {
        self.notify_all(ArenaEvent::MovePlayer(command.clone()));

        let idx = self
            .player_index(&command.player_id)
            .ok_or_else(|| CommandError::UnknownPlayer(command.player_id.clone()))?;
        let dir = Direction::parse_key(&command.key_pressed)
            .ok_or_else(|| CommandError::InvalidDirection(command.key_pressed.clone()))?;
        if self.players[idx].score <= 0 {
            return Err(CommandError::PlayerDead(command.player_id));
        }

        let (nx, ny) = offset(self.players[idx].x, self.players[idx].y, dir);
        let x = wrap(self.screen.width, nx);
        let y = wrap(self.screen.height, ny);
        self.players[idx].x = x;
        self.players[idx].y = y;

        let fruit_collected = self.check_for_fruit_collision(&command.player_id);
        let collisions = self.check_for_player_collision(&command.player_id);
        Ok(MoveReport {
            x,
            y,
            fruit_collected,
            collisions,
        })
    }

    fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|player| player.id == player_id)
    }

    fn notify_all(&mut self, event: ArenaEvent) {
        for sink in &mut self.sinks {
            sink.notify(&event);
        }
    }
}
