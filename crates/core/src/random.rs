//! Random sampling used by showcase and "you may also like" sections

use rand::Rng;

/// Pick `min(n, items.len())` items in random order without reusing a position.
pub fn get_random_items<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    get_random_items_with(items, n, &mut rand::thread_rng())
}

/// [`get_random_items`] driven by a caller-supplied rng.
///
/// Runs a partial Fisher–Yates shuffle over the index range, so only the
/// first `n` swaps are performed.
pub fn get_random_items_with<T: Clone, R: Rng + ?Sized>(items: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let take = n.min(items.len());
    let mut indices: Vec<usize> = (0..items.len()).collect();

    for i in 0..take {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }

    indices[..take].iter().map(|&i| items[i].clone()).collect()
}
