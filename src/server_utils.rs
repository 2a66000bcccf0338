use crate::constants::{
    DEFAULT_PORT, FRUIT_DROP_INTERVAL_MS, MAX_FRUIT_DROP_INTERVAL_MS, MIN_FRUIT_DROP_INTERVAL_MS,
};

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// `None` turns auto-drop off (`0`); anything unparsable falls back to the default.
pub fn normalize_drop_interval_ms(raw: Option<&str>) -> Option<u64> {
    let Some(value) = raw.and_then(|value| value.trim().parse::<u64>().ok()) else {
        return Some(FRUIT_DROP_INTERVAL_MS);
    };
    if value == 0 {
        return None;
    }
    Some(value.clamp(MIN_FRUIT_DROP_INTERVAL_MS, MAX_FRUIT_DROP_INTERVAL_MS))
}

pub fn parse_seed(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
}
