//! Synthetic training data with hard retention rules.
//!
//! Each sample is labelled "leaves" by the first rule that fires:
//! 1. commute > 90 min
//! 2. fewer than 3 verified skills
//! 3. night-only shift and age > 50
//! 4. under 2 years of experience and salary expectation > 100000
//! 5. no certifications with more than 5 verified skills
//!
//! Then a small share of labels is flipped as noise.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::schema::{FeatureVector, ShiftPreference};

pub const DEFAULT_NOISE_RATE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub vector: FeatureVector,
    pub retained: bool,
}

/// Ground-truth label for a vector and the latent age.
pub fn retention_label(vector: &FeatureVector, age: u32) -> bool {
    let leaves = vector.commute_time_minutes > 90
        || vector.skills_verified_count < 3
        || (vector.shift_preference == ShiftPreference::NightOnly && age > 50)
        || (vector.years_experience < 2.0 && vector.salary_expectation > 100_000)
        || (!vector.has_certifications && vector.skills_verified_count > 5);
    !leaves
}

pub struct SyntheticDataGenerator {
    rng: StdRng,
    noise_rate: f64,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise_rate: DEFAULT_NOISE_RATE,
        }
    }

    /// Share of labels flipped, clamped to [0, 1]. Non-finite rates fall back to the default.
    pub fn with_noise(mut self, noise_rate: f64) -> Self {
        self.noise_rate = if noise_rate.is_finite() {
            noise_rate.clamp(0.0, 1.0)
        } else {
            DEFAULT_NOISE_RATE
        };
        self
    }

    pub fn generate(&mut self, count: usize) -> Vec<LabeledSample> {
        (0..count).map(|_| self.sample()).collect()
    }

    fn sample(&mut self) -> LabeledSample {
        let years: f64 = self.rng.gen_range(0.0..30.0);
        let vector = FeatureVector {
            skills_verified_count: self.rng.gen_range(0..=10),
            years_experience: (years * 10.0).round() / 10.0,
            commute_time_minutes: self.rng.gen_range(10..=180),
            shift_preference: *ShiftPreference::ALL
                .choose(&mut self.rng)
                .unwrap_or(&ShiftPreference::Any),
            salary_expectation: self.rng.gen_range(30_000..=150_000),
            has_certifications: self.rng.gen_bool(0.3),
        };
        let age = self.rng.gen_range(20..=60);

        let mut retained = retention_label(&vector, age);
        if self.rng.gen_bool(self.noise_rate) {
            retained = !retained;
        }
        LabeledSample { vector, retained }
    }
}

/// Writes samples as CSV with a header row.
pub fn write_csv<W: Write>(samples: &[LabeledSample], mut out: W) -> io::Result<()> {
    writeln!(
        out,
        "skills_verified_count,years_experience,commute_time_minutes,shift_preference,salary_expectation,has_certifications,retention"
    )?;
    for s in samples {
        let v = &s.vector;
        writeln!(
            out,
            "{},{:.1},{},{},{},{},{}",
            v.skills_verified_count,
            v.years_experience,
            v.commute_time_minutes,
            v.shift_preference.code(),
            v.salary_expectation,
            u8::from(v.has_certifications),
            u8::from(s.retained)
        )?;
    }
    Ok(())
}
