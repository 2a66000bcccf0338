pub const DEFAULT_SCREEN_WIDTH: i32 = 25;
pub const DEFAULT_SCREEN_HEIGHT: i32 = 25;
pub const DEFAULT_PIXELS_PER_FIELD: i32 = 5;

pub const DEFAULT_MAX_COLLISION_DISTANCE: i32 = 4;
pub const DEFAULT_LOSS_ON_COLLISION: i32 = 5;
pub const DEFAULT_INITIAL_SCORE: i32 = 50;
pub const DEFAULT_AUTO_DROP_FRUIT_VALUE: i32 = 1;

pub const FRUIT_DROP_INTERVAL_MS: u64 = 2_000;
pub const MIN_FRUIT_DROP_INTERVAL_MS: u64 = 100;
pub const MAX_FRUIT_DROP_INTERVAL_MS: u64 = 60_000;

pub const DEFAULT_PORT: u16 = 8080;
pub const CLIENT_QUEUE_CAPACITY: usize = 256;
