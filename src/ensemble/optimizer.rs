//! Particle swarm search over the weight simplex.
//!
//! Each particle is a candidate weight vector. After every move its position
//! is clamped to [0, 1] and renormalized onto the simplex (never resampled),
//! so every iteration finishes in bounded time. The search stops at the
//! iteration budget or after `patience` iterations without improvement,
//! whichever comes first.

use super::objective::Objective;
use super::weights::WeightVector;
use crate::config::OptimizerConfig;
use crate::error::{EngineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Result of one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub weights: WeightVector,
    /// Objective value at `weights`
    pub objective: f64,
    pub iterations: usize,
    /// Stopped on the patience rule rather than the iteration budget
    pub stopped_early: bool,
    /// One classifier holds (almost) all the weight. A valid optimum, flagged for monitoring.
    pub degenerate: bool,
}

struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_score: f64,
}

#[derive(Debug, Clone)]
pub struct SwarmOptimizer {
    config: OptimizerConfig,
}

impl SwarmOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Request-local generator: seeded when configured, otherwise from OS entropy.
    pub fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Search for the weight vector minimizing `objective`.
    pub fn optimize<O, R>(&self, objective: &O, rng: &mut R) -> Result<Optimization>
    where
        O: Objective + ?Sized,
        R: Rng + ?Sized,
    {
        let n = objective.dimension();
        if n == 0 {
            return Err(EngineError::EmptyEnsemble);
        }
        if n == 1 {
            let weights = WeightVector::uniform(1)?;
            let score = evaluate(objective, weights.as_slice());
            return Ok(Optimization {
                weights,
                objective: score,
                iterations: 0,
                stopped_early: false,
                degenerate: false,
            });
        }

        let c = &self.config;
        let vmax = c.max_velocity;

        let mut swarm: Vec<Particle> = (0..c.particles)
            .map(|_| {
                let position = sample_simplex(n, rng);
                let velocity = (0..n).map(|_| rng.gen_range(-vmax..=vmax)).collect();
                let score = evaluate(objective, &position);
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_score: score,
                }
            })
            .collect();

        let (mut global_best, mut global_score) = best_of(&swarm);
        let mut stalled = 0usize;
        let mut iterations = 0usize;
        let mut stopped_early = false;

        for iteration in 1..=c.max_iterations {
            iterations = iteration;
            for p in swarm.iter_mut() {
                for d in 0..n {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    let v = c.inertia * p.velocity[d]
                        + c.cognitive * r1 * (p.best_position[d] - p.position[d])
                        + c.social * r2 * (global_best[d] - p.position[d]);
                    p.velocity[d] = v.clamp(-vmax, vmax);
                    p.position[d] = (p.position[d] + p.velocity[d]).clamp(0.0, 1.0);
                }
                project_onto_simplex(&mut p.position);

                let score = evaluate(objective, &p.position);
                if score < p.best_score {
                    p.best_score = score;
                    p.best_position.clone_from(&p.position);
                }
            }

            let (candidate, candidate_score) = best_of(&swarm);
            if global_score - candidate_score > c.tolerance {
                stalled = 0;
            } else {
                stalled += 1;
            }
            if candidate_score < global_score {
                global_best = candidate;
                global_score = candidate_score;
            }
            if stalled >= c.patience {
                stopped_early = true;
                break;
            }
        }

        let weights = WeightVector::normalized(global_best)?;
        let degenerate = weights.is_degenerate(c.degenerate_epsilon);
        if degenerate {
            tracing::warn!(weights = ?weights.as_slice(), "optimizer converged to a degenerate weight vector");
        }
        tracing::debug!(
            iterations,
            stopped_early,
            objective = global_score,
            "swarm optimization finished"
        );

        Ok(Optimization {
            weights,
            objective: global_score,
            iterations,
            stopped_early,
            degenerate,
        })
    }
}

/// Non-finite objective values rank last.
fn evaluate<O: Objective + ?Sized>(objective: &O, weights: &[f64]) -> f64 {
    let v = objective.evaluate(weights);
    if v.is_finite() {
        v
    } else {
        f64::INFINITY
    }
}

fn best_of(swarm: &[Particle]) -> (Vec<f64>, f64) {
    let mut best = &swarm[0];
    for p in &swarm[1..] {
        if p.best_score < best.best_score {
            best = p;
        }
    }
    (best.best_position.clone(), best.best_score)
}

/// Uniform draw from the simplex via normalized exponentials.
fn sample_simplex<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    let mut v: Vec<f64> = (0..n)
        .map(|_| {
            let u: f64 = rng.gen();
            -(1.0 - u).ln()
        })
        .collect();
    project_onto_simplex(&mut v);
    v
}

/// Rescale non-negative coordinates to sum to 1; an all-zero point maps to the centre.
fn project_onto_simplex(v: &mut [f64]) {
    let sum: f64 = v.iter().sum();
    if sum > f64::EPSILON {
        v.iter_mut().for_each(|x| *x /= sum);
    } else {
        let u = 1.0 / v.len() as f64;
        v.iter_mut().for_each(|x| *x = u);
    }
}
