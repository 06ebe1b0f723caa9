//! Endpoint selection for one scheduling round.

use rand::Rng;

/// Fewest endpoints a round can pick from.
pub const MIN_ENDPOINTS: usize = 2;

/// Two distinct indices drawn uniformly from `0..len`; the second is redrawn
/// until it differs from the first. `None` when `len < MIN_ENDPOINTS`.
pub fn pick_two_distinct<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<(usize, usize)> {
    if len < MIN_ENDPOINTS {
        return None;
    }
    let first = rng.gen_range(0..len);
    let mut second = rng.gen_range(0..len);
    while second == first {
        second = rng.gen_range(0..len);
    }
    Some((first, second))
}
