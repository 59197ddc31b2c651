use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub label: usize,
}

/// Seeded shuffle followed by a tail split. The held-out share is
/// `ceil(len * test_ratio)`, capped so at least one training sample remains.
pub fn shuffle_split(
    samples: Vec<Sample>,
    test_ratio: f64,
    seed: u64,
) -> (Vec<Sample>, Vec<Sample>) {
    debug_assert!((0.0..1.0).contains(&test_ratio));
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut data = samples;
    data.shuffle(&mut rng);
    let test_len = ((data.len() as f64) * test_ratio).ceil() as usize;
    let test_len = test_len.min(data.len().saturating_sub(1));
    let split_index = data.len() - test_len;
    let test = data.split_off(split_index);
    (data, test)
}
