use rand::Rng;

/// A walk of `len` values starting at 1.0, each step adding a uniform draw from `[-1, 1)`.
pub fn random_walk<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<f64> {
    let mut value = 1.0;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(value);
        value += rng.gen_range(-1.0..1.0);
    }
    values
}
