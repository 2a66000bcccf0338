use crate::types::Direction;

/// Non-negative remainder in `[0, modulus)`, also for negative `value`.
pub(crate) fn wrap(modulus: i32, value: i32) -> i32 {
    if modulus <= 0 {
        return 0;
    }
    ((value % modulus) + modulus) % modulus
}

pub(super) fn offset(x: i32, y: i32, dir: Direction) -> (i32, i32) {
    match dir {
        Direction::Up => (x, y - 1),
        Direction::Down => (x, y + 1),
        Direction::Left => (x - 1, y),
        Direction::Right => (x + 1, y),
    }
}

pub fn fruit_key(x: i32, y: i32) -> String {
    format!("{x}-{y}")
}

/// Inclusive `[min, max]` span of cells within `distance` of `center`, clipped to the grid.
pub(super) fn clipped_span(center: i32, distance: i32, size: i32) -> (i32, i32) {
    let min = (center - distance).max(0);
    let max = (center + distance).min(size - 1);
    (min, max.max(min))
}
