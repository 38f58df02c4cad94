use std::f64::consts::PI;

use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait NormalSampler {
    fn standard_normal(&mut self) -> f64;

    fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }
}

/// Box-Muller transform over any uniform generator.
///
/// Each pair of uniforms yields two normals; the sine branch is cached and
/// returned by the next call. Draws are reproducible when the underlying
/// generator is seeded (see [`BoxMuller::seeded`]).
#[derive(Debug, Clone)]
pub struct BoxMuller<R> {
    rng: R,
    cached_normal: Option<f64>,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            cached_normal: None,
        }
    }

    fn open_unit(&mut self) -> f64 {
        // ln(0) is undefined, so a zero draw is thrown away.
        loop {
            let u: f64 = self.rng.sample(Standard);
            if u > 0.0 {
                return u;
            }
        }
    }
}

impl BoxMuller<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NormalSampler for BoxMuller<R> {
    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.open_unit();
        let u2: f64 = self.rng.sample(Standard);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }
}

pub fn derive_seed(base_seed: u64, stream: u64, index: u32) -> u64 {
    let mixed = base_seed ^ (stream << 32) ^ index as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
