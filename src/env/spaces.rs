use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::EnvError;

/// A set of valid values with a uniform sampler.
pub trait Space<T> {
    fn sample(&mut self) -> T;
    fn contains(&self, value: &T) -> bool;
    fn seed(&mut self, seed: u64);
}

/// Integers `start..start + n`.
#[derive(Debug, Clone)]
pub struct Discrete {
    n: usize,
    start: usize,
    rng: StdRng,
}

impl Discrete {
    pub fn new(n: usize) -> Result<Self, EnvError> {
        Self::with_start(n, 0)
    }

    pub fn with_start(n: usize, start: usize) -> Result<Self, EnvError> {
        if n == 0 {
            return Err(EnvError::Other(
                "discrete space must have at least one element".into(),
            ));
        }
        Ok(Self {
            n,
            start,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn start(&self) -> usize {
        self.start
    }
}

impl Space<usize> for Discrete {
    fn sample(&mut self) -> usize {
        self.start + self.rng.gen_range(0..self.n)
    }

    fn contains(&self, value: &usize) -> bool {
        *value >= self.start && *value - self.start < self.n
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Axis-aligned box over `[f64; N]`.
#[derive(Debug, Clone)]
pub struct BoxSpace<const N: usize> {
    low: [f64; N],
    high: [f64; N],
    rng: StdRng,
}

impl<const N: usize> BoxSpace<N> {
    pub fn new(low: [f64; N], high: [f64; N]) -> Result<Self, EnvError> {
        if low.iter().zip(&high).any(|(l, h)| !(l <= h)) {
            return Err(EnvError::Other(
                "box space requires low <= high in every dimension".into(),
            ));
        }
        Ok(Self {
            low,
            high,
            rng: StdRng::from_entropy(),
        })
    }

    /// Box centred on the origin, `[-high, high]` per dimension.
    pub fn symmetric(high: [f64; N]) -> Result<Self, EnvError> {
        Self::new(high.map(|h| -h), high)
    }

    pub fn low(&self) -> &[f64; N] {
        &self.low
    }

    pub fn high(&self) -> &[f64; N] {
        &self.high
    }

    pub fn dim(&self) -> usize {
        N
    }
}

impl<const N: usize> Space<[f64; N]> for BoxSpace<N> {
    /// Uniform within the bounds. Dimensions whose width is not finite
    /// (e.g. `[-f64::MAX, f64::MAX]`) fall back to a standard normal draw.
    fn sample(&mut self) -> [f64; N] {
        let mut out = [0.0; N];
        for (i, v) in out.iter_mut().enumerate() {
            let (low, high) = (self.low[i], self.high[i]);
            *v = if (high - low).is_finite() {
                if low == high {
                    low
                } else {
                    self.rng.gen_range(low..high)
                }
            } else {
                self.rng.sample::<f64, _>(StandardNormal)
            };
        }
        out
    }

    fn contains(&self, value: &[f64; N]) -> bool {
        value
            .iter()
            .zip(self.low.iter().zip(&self.high))
            .all(|(v, (l, h))| *v >= *l && *v <= *h)
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}
