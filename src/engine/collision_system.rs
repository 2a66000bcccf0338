use tracing::debug;

use super::utils::clipped_span;
use super::*;
use crate::types::CollisionReport;

impl ArenaEngine {
    /// Consumes every fruit on the player's cell. Returns the points gained.
    pub fn check_for_fruit_collision(&mut self, player_id: &str) -> i32 {
        let Some(player) = self.player(player_id) else {
            return 0;
        };
        let fruit_ids: Vec<String> = self
            .fruits
            .iter()
            .filter(|fruit| fruit.x == player.x && fruit.y == player.y)
            .map(|fruit| fruit.id.clone())
            .collect();

        let mut collected = 0;
        for fruit_id in fruit_ids {
            if let Some(fruit) = self.remove_fruit(&fruit_id) {
                collected = fruit.quantity.saturating_add(collected);
            }
        }
        if collected > 0 {
            if let Some(idx) = self.player_index(player_id) {
                self.players[idx].score = self.players[idx].score.saturating_add(collected);
            }
            debug!(player_id, collected, x = player.x, y = player.y, "fruit collected");
        }
        collected
    }

    /// Shocks every other live player on the mover's cell, one at a time, in
    /// registry order. Each hit uses the scores as left by the previous one.
    pub fn check_for_player_collision(&mut self, player_id: &str) -> Vec<CollisionReport> {
        let mut reports = Vec::new();
        let Some(self_idx) = self.player_index(player_id) else {
            return reports;
        };
        let (x, y) = (self.players[self_idx].x, self.players[self_idx].y);
        let cost = self.config.loss_on_collision.max(0);

        for other_idx in 0..self.players.len() {
            if other_idx == self_idx {
                continue;
            }
            let other = &self.players[other_idx];
            if other.x != x || other.y != y || other.score <= 0 {
                continue;
            }

            let discount_other = other.score.min(cost);
            let discount_self = self.players[self_idx].score.clamp(0, cost);
            let total_fruits = discount_other + discount_self;
            self.players[other_idx].score -= discount_other;
            self.players[self_idx].score -= discount_self;

            let other_id = self.players[other_idx].id.clone();
            debug!(
                player_id,
                other_id = %other_id,
                discount_self,
                discount_other,
                x,
                y,
                "player collision"
            );
            self.explode_fruits(total_fruits, x, y);
            reports.push(CollisionReport {
                other_id,
                discount_other,
                discount_self,
                total_fruits,
                x,
                y,
            });
        }
        reports
    }

    /// Scatters `quantity` points as fruit within `maxCollisionDistance` of
    /// `(x, y)`. Each drop carries a random slice of what is left, so the
    /// returned drops always add up to `quantity`.
    pub fn explode_fruits(&mut self, quantity: i32, x: i32, y: i32) -> Vec<FruitView> {
        let distance = self.config.max_collision_distance.max(0);
        let (min_x, max_x) = clipped_span(x, distance, self.screen.width);
        let (min_y, max_y) = clipped_span(y, distance, self.screen.height);

        let mut drops = Vec::new();
        let mut remaining = quantity;
        while remaining > 0 {
            let amount = self.rng.int(1, remaining);
            let fx = self.rng.int(min_x, max_x);
            let fy = self.rng.int(min_y, max_y);
            let landed = self.add_fruit(FruitDrop {
                fruit_id: None,
                x: Some(fx),
                y: Some(fy),
                quantity: Some(amount),
            });
            if let Some(fruit) = landed {
                drops.push(FruitView {
                    quantity: amount,
                    ..fruit
                });
            }
            remaining -= amount;
        }
        if !drops.is_empty() {
            debug!(quantity, x, y, drops = drops.len(), "fruit exploded");
        }
        drops
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use proptest::prelude::*;

    use crate::config::ArenaSettings;
    use crate::engine::{fruit_key, ArenaEngine};
    use crate::types::{ArenaEvent, FruitDrop, FruitView, MoveCommand, PlayerView, StatePatch};

    fn make_engine(seed: u64, shock_cost: i32) -> ArenaEngine {
        let mut settings = ArenaSettings::default();
        settings.config.loss_on_collision = shock_cost;
        ArenaEngine::with_seed(settings, seed)
    }

    fn set_players(engine: &mut ArenaEngine, players: &[(&str, i32, i32, i32)]) {
        engine.set_state(StatePatch {
            players: Some(
                players
                    .iter()
                    .map(|(id, x, y, score)| PlayerView {
                        id: id.to_string(),
                        x: *x,
                        y: *y,
                        score: *score,
                    })
                    .collect(),
            ),
            ..StatePatch::default()
        });
    }

    fn score_of(engine: &ArenaEngine, player_id: &str) -> i32 {
        engine
            .player(player_id)
            .map(|player| player.score)
            .expect("player should exist")
    }

    #[test]
    fn head_on_collision_scatters_both_discounts() {
        let mut engine = make_engine(42, 5);
        set_players(&mut engine, &[("a", 10, 10, 10), ("b", 10, 9, 10)]);

        let report = engine
            .move_player(MoveCommand {
                player_id: "a".to_string(),
                key_pressed: "ArrowUp".to_string(),
            })
            .expect("move should apply");

        assert_eq!((report.x, report.y), (10, 9));
        assert_eq!(report.collisions.len(), 1);
        let hit = &report.collisions[0];
        assert_eq!(hit.other_id, "b");
        assert_eq!(hit.discount_other, 5);
        assert_eq!(hit.discount_self, 5);
        assert_eq!(hit.total_fruits, 10);
        assert_eq!(score_of(&engine, "a"), 5);
        assert_eq!(score_of(&engine, "b"), 5);

        let state = engine.state();
        assert_eq!(engine.total_fruit_value(), 10);
        for fruit in &state.fruits {
            assert!((6..=14).contains(&fruit.x), "fruit x out of range: {}", fruit.x);
            assert!((5..=13).contains(&fruit.y), "fruit y out of range: {}", fruit.y);
        }
    }

    #[test]
    fn discount_is_capped_by_remaining_score() {
        let mut engine = make_engine(1, 5);
        set_players(&mut engine, &[("a", 0, 0, 2), ("b", 0, 0, 3)]);

        let reports = engine.check_for_player_collision("a");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].discount_self, 2);
        assert_eq!(reports[0].discount_other, 3);
        assert_eq!(reports[0].total_fruits, 5);
        assert_eq!(score_of(&engine, "a"), 0);
        assert_eq!(score_of(&engine, "b"), 0);
        assert_eq!(engine.total_fruit_value(), 5);
    }

    #[test]
    fn drained_players_are_not_hit_again() {
        let mut engine = make_engine(1, 5);
        set_players(&mut engine, &[("a", 3, 3, 20), ("b", 3, 3, 0)]);

        assert!(engine.check_for_player_collision("a").is_empty());
        assert_eq!(score_of(&engine, "a"), 20);
        assert_eq!(engine.total_fruit_value(), 0);
    }

    #[test]
    fn crowded_cell_discounts_the_mover_sequentially() {
        let mut engine = make_engine(8, 5);
        set_players(
            &mut engine,
            &[("b", 4, 4, 10), ("a", 4, 4, 7), ("c", 4, 4, 10)],
        );

        let reports = engine.check_for_player_collision("a");
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].other_id, "b");
        assert_eq!(reports[0].discount_self, 5);
        assert_eq!(reports[1].other_id, "c");
        assert_eq!(reports[1].discount_self, 2);

        assert_eq!(score_of(&engine, "a"), 0);
        assert_eq!(score_of(&engine, "b"), 5);
        assert_eq!(score_of(&engine, "c"), 5);
        assert_eq!(engine.total_fruit_value(), 17);
    }

    #[test]
    fn fruit_collision_consumes_every_fruit_on_the_cell() {
        let mut engine = make_engine(1, 5);
        set_players(&mut engine, &[("a", 2, 2, 1)]);
        engine.set_state(StatePatch {
            fruits: Some(vec![
                FruitView {
                    id: "legacy-1".to_string(),
                    x: 2,
                    y: 2,
                    quantity: 1,
                },
                FruitView {
                    id: "legacy-2".to_string(),
                    x: 2,
                    y: 2,
                    quantity: 4,
                },
                FruitView {
                    id: "3-2".to_string(),
                    x: 3,
                    y: 2,
                    quantity: 9,
                },
            ]),
            ..StatePatch::default()
        });

        assert_eq!(engine.check_for_fruit_collision("a"), 5);
        assert_eq!(score_of(&engine, "a"), 6);
        assert_eq!(engine.state().fruits.len(), 1);
        assert_eq!(engine.check_for_fruit_collision("missing"), 0);
    }

    #[test]
    fn pickup_of_a_huge_stack_saturates_the_score() {
        let mut engine = make_engine(1, 5);
        set_players(&mut engine, &[("a", 2, 2, 50)]);
        engine.add_fruit(FruitDrop {
            x: Some(2),
            y: Some(2),
            quantity: Some(i32::MAX),
            ..FruitDrop::default()
        });

        assert_eq!(engine.check_for_fruit_collision("a"), i32::MAX);
        assert_eq!(score_of(&engine, "a"), i32::MAX);
        assert!(engine.fruit_at(2, 2).is_none());
    }

    #[test]
    fn explosion_around_off_grid_centre_reports_landed_cells() {
        let mut engine = make_engine(9, 5);
        let drops = engine.explode_fruits(40, 30, -3);
        assert_eq!(drops.iter().map(|drop| drop.quantity).sum::<i32>(), 40);
        for drop in &drops {
            assert!((0..25).contains(&drop.x));
            assert!((0..25).contains(&drop.y));
            assert_eq!(drop.id, fruit_key(drop.x, drop.y));
            assert!(engine.fruit(&drop.id).is_some());
        }
        assert_eq!(engine.total_fruit_value(), 40);
    }

    #[test]
    fn explosion_near_corner_stays_on_grid() {
        let mut engine = make_engine(3, 5);
        let drops = engine.explode_fruits(200, 0, 24);
        let total: i32 = drops.iter().map(|drop| drop.quantity).sum();
        assert_eq!(total, 200);
        for fruit in engine.state().fruits {
            assert!((0..=4).contains(&fruit.x));
            assert!((20..=24).contains(&fruit.y));
            assert_eq!(fruit.id, fruit_key(fruit.x, fruit.y));
        }
        assert_eq!(engine.total_fruit_value(), 200);
    }

    #[test]
    fn explosion_emits_add_fruit_with_stacked_quantity() {
        let mut engine = make_engine(3, 5);
        engine.set_state(StatePatch {
            config: Some(crate::types::ArenaConfig {
                max_collision_distance: 0,
                ..engine.config()
            }),
            ..StatePatch::default()
        });
        engine.add_fruit(FruitDrop {
            x: Some(5),
            y: Some(5),
            quantity: Some(2),
            ..FruitDrop::default()
        });
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        engine.subscribe(move |event: &ArenaEvent| {
            sink_events.lock().expect("event log lock").push(event.clone());
        });

        let drops = engine.explode_fruits(3, 5, 5);
        assert!(drops.iter().all(|drop| drop.id == "5-5"));
        assert_eq!(engine.fruit("5-5").map(|fruit| fruit.quantity), Some(5));
        let last = events.lock().expect("event log lock").last().cloned();
        assert_eq!(
            last,
            Some(ArenaEvent::AddFruit {
                fruit_id: "5-5".to_string(),
                x: 5,
                y: 5,
                quantity: 5,
            })
        );
    }

    #[test]
    fn empty_explosion_drops_nothing() {
        let mut engine = make_engine(3, 5);
        assert!(engine.explode_fruits(0, 5, 5).is_empty());
        assert!(engine.explode_fruits(-4, 5, 5).is_empty());
        assert_eq!(engine.total_fruit_value(), 0);
    }

    proptest! {
        #[test]
        fn collision_conserves_value(
            seed in 0u64..5_000,
            mover_score in 1i32..40,
            other_score in 1i32..40,
            cost in 0i32..12,
            distance in 0i32..6,
        ) {
            let mut engine = make_engine(seed, cost);
            engine.set_state(StatePatch {
                config: Some(crate::types::ArenaConfig {
                    max_collision_distance: distance,
                    ..engine.config()
                }),
                ..StatePatch::default()
            });
            set_players(&mut engine, &[("a", 12, 12, mover_score), ("b", 12, 13, other_score)]);

            let report = engine
                .move_player(MoveCommand {
                    player_id: "a".to_string(),
                    key_pressed: "ArrowDown".to_string(),
                })
                .expect("move should apply");

            prop_assert_eq!(report.collisions.len(), 1);
            let hit = &report.collisions[0];
            prop_assert_eq!(hit.total_fruits, hit.discount_other + hit.discount_self);
            prop_assert_eq!(hit.discount_self, mover_score.min(cost));
            prop_assert_eq!(hit.discount_other, other_score.min(cost));
            prop_assert_eq!(engine.total_fruit_value(), hit.total_fruits as i64);
            for fruit in engine.state().fruits {
                prop_assert!((fruit.x - 12).abs() <= distance);
                prop_assert!((fruit.y - 13).abs() <= distance);
            }
        }
    }
}
