use tracing::warn;

use super::Speaker;

/// First id in the implicit allocation sequence.
pub const FIRST_ID: char = 'A';
/// Last id; the sequence holds 26 single-letter ids in total.
pub const LAST_ID: char = 'Z';

/// Next id in sequence, or None once `LAST_ID` is reached.
///
/// This is the allocation policy for every interactive path: running out of
/// ids is a clean failure the caller must check, never a wraparound.
pub fn id_after(id: char) -> Option<char> {
    if id >= LAST_ID {
        None
    } else {
        char::from_u32(id as u32 + 1)
    }
}

/// Next id in sequence, wrapping `LAST_ID` back to `FIRST_ID`.
///
/// Kept for the parser's allocation cursor only. A 27th distinct speaker
/// collides with the first — callers get a warning when the wrap fires.
pub fn wrapping_id_after(id: char) -> char {
    match id_after(id) {
        Some(next) => next,
        None => {
            warn!("speaker ids exhausted at '{LAST_ID}', wrapping to '{FIRST_ID}' (ids will collide)");
            FIRST_ID
        }
    }
}

/// Pre-allocated pool of `size` speakers with empty names, ids A, B, C, ...
/// Size is capped at the 26 available ids.
pub fn fixed_pool(size: usize) -> Vec<Speaker> {
    let size = size.min(26);
    let mut pool = Vec::with_capacity(size);
    let mut id = FIRST_ID;
    for _ in 0..size {
        pool.push(Speaker {
            id: id.to_string(),
            name: String::new(),
        });
        match id_after(id) {
            Some(next) => id = next,
            None => break,
        }
    }
    pool
}
