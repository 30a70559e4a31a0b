//! Real-valued genetic algorithm for strategy parameter search.
//!
//! One generation:
//!
//! 1. every solution is scored by the fitness function
//! 2. the best `parents_mating` solutions become parents (steady state)
//! 3. offspring are bred by single-point crossover of neighbouring parents
//! 4. one gene of each offspring is replaced by a random draw from its space
//! 5. the next population is the parents followed by the offspring
//!
//! Parents survive unchanged, so the best fitness never decreases.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Allowed values of one gene: `[low, high)`, optionally on a `step` grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneSpace {
    pub low: f64,
    pub high: f64,
    pub step: Option<f64>,
}

impl GeneSpace {
    /// Continuous range.
    #[must_use]
    pub const fn range(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            step: None,
        }
    }

    /// Grid `low, low + step, ...` below `high`.
    #[must_use]
    pub const fn stepped(low: f64, high: f64, step: f64) -> Self {
        Self {
            low,
            high,
            step: Some(step),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn grid_len(&self, step: f64) -> u64 {
        (((self.high - self.low) / step) - 1e-9).ceil().max(1.0) as u64
    }

    /// Draws a value from the space.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.high <= self.low {
            return self.low;
        }
        match self.step {
            Some(step) if step > 0.0 => {
                let index = rng.gen_range(0..self.grid_len(step));
                round_to_grid(self.low + index as f64 * step, step)
            }
            _ => rng.gen_range(self.low..self.high),
        }
    }
}

fn round_to_grid(value: f64, step: f64) -> f64 {
    let decimals = (-step.log10()).ceil().max(0.0);
    let scale = 10f64.powf(decimals + 2.0);
    (value * scale).round() / scale
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticSettings {
    pub generations: usize,
    /// Population size.
    pub solutions: usize,
    pub parents_mating: usize,
    /// Genes replaced per offspring.
    pub mutation_genes: usize,
    /// Optional seed for reproducible searches.
    pub seed: Option<u64>,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            generations: 50,
            solutions: 20,
            parents_mating: 5,
            mutation_genes: 1,
            seed: None,
        }
    }
}

/// Best solution found by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub genes: Vec<f64>,
    pub fitness: f64,
    /// Best fitness after each generation.
    pub history: Vec<f64>,
}

/// Genetic optimizer over a fixed list of gene spaces.
pub struct GeneticAlgorithm {
    spaces: Vec<GeneSpace>,
    settings: GeneticSettings,
}

fn by_fitness(a: &f64, b: &f64) -> Ordering {
    // NaN ranks last
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.total_cmp(b),
    }
}

impl GeneticAlgorithm {
    #[must_use]
    pub fn new(spaces: Vec<GeneSpace>, settings: GeneticSettings) -> Self {
        Self { spaces, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &GeneticSettings {
        &self.settings
    }

    fn random_solution(&self, rng: &mut ChaCha8Rng) -> Vec<f64> {
        self.spaces.iter().map(|space| space.sample(rng)).collect()
    }

    fn crossover(&self, first: &[f64], second: &[f64], rng: &mut ChaCha8Rng) -> Vec<f64> {
        let point = rng.gen_range(0..self.spaces.len());
        first[..point]
            .iter()
            .chain(&second[point..])
            .copied()
            .collect()
    }

    fn mutate(&self, genes: &mut [f64], rng: &mut ChaCha8Rng) {
        let count = self.settings.mutation_genes.min(genes.len());
        let indices = rand::seq::index::sample(rng, genes.len(), count);
        for index in indices {
            genes[index] = self.spaces[index].sample(rng);
        }
    }

    /// Runs the search, maximizing `fitness`.
    ///
    /// Returns `None` when there are no genes or no solutions to evolve.
    pub fn run<F>(&self, fitness: F) -> Option<Solution>
    where
        F: Fn(&[f64]) -> f64,
    {
        let solutions = self.settings.solutions;
        if self.spaces.is_empty() || solutions == 0 {
            return None;
        }
        let parents_mating = self.settings.parents_mating.clamp(1, solutions);

        let mut rng = match self.settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut population: Vec<Vec<f64>> =
            (0..solutions).map(|_| self.random_solution(&mut rng)).collect();
        let mut scores: Vec<f64> = population.iter().map(|genes| fitness(genes)).collect();
        let mut history = Vec::with_capacity(self.settings.generations);

        for generation in 0..self.settings.generations {
            let mut order: Vec<usize> = (0..population.len()).collect();
            order.sort_by(|&a, &b| by_fitness(&scores[b], &scores[a]));

            let parents: Vec<Vec<f64>> = order[..parents_mating]
                .iter()
                .map(|&i| population[i].clone())
                .collect();
            let parent_scores: Vec<f64> = order[..parents_mating].iter().map(|&i| scores[i]).collect();

            let offspring_count = solutions - parents_mating;
            let mut offspring: Vec<Vec<f64>> = Vec::with_capacity(offspring_count);
            for k in 0..offspring_count {
                let first = &parents[k % parents_mating];
                let second = &parents[(k + 1) % parents_mating];
                let mut child = self.crossover(first, second, &mut rng);
                self.mutate(&mut child, &mut rng);
                offspring.push(child);
            }

            let offspring_scores: Vec<f64> = offspring.iter().map(|genes| fitness(genes)).collect();

            population = parents;
            population.extend(offspring);
            scores = parent_scores;
            scores.extend(offspring_scores);

            let best = scores.iter().copied().max_by(by_fitness).unwrap_or(f64::NAN);
            tracing::debug!("Generation {}: best fitness {:.4}", generation + 1, best);
            history.push(best);
        }

        let best_index = (0..population.len()).max_by(|&a, &b| by_fitness(&scores[a], &scores[b]))?;

        Some(Solution {
            genes: population[best_index].clone(),
            fitness: scores[best_index],
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepped_space_stays_on_grid() {
        let space = GeneSpace::stepped(0.1, 3.0, 0.01);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1_000 {
            let value = space.sample(&mut rng);
            assert!((0.1..3.0).contains(&value));
            let steps = (value - 0.1) / 0.01;
            assert!((steps - steps.round()).abs() < 1e-6);
        }

        let lengths = GeneSpace::stepped(1.0, 200.0, 1.0);
        for _ in 0..1_000 {
            let value = lengths.sample(&mut rng);
            assert_eq!(value, value.round());
            assert!((1.0..200.0).contains(&value));
        }
    }

    #[test]
    fn test_finds_maximum_of_smooth_function() {
        let ga = GeneticAlgorithm::new(
            vec![GeneSpace::range(0.0, 1.0), GeneSpace::range(0.0, 1.0)],
            GeneticSettings {
                generations: 60,
                solutions: 20,
                parents_mating: 5,
                mutation_genes: 1,
                seed: Some(42),
            },
        );

        let solution = ga
            .run(|genes| -((genes[0] - 0.3).powi(2) + (genes[1] - 0.7).powi(2)))
            .unwrap();

        assert!(solution.fitness > -0.01, "fitness {}", solution.fitness);
        assert_eq!(solution.history.len(), 60);
        // parents survive, so the best never gets worse
        assert!(solution.history.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let settings = GeneticSettings {
            generations: 10,
            solutions: 8,
            parents_mating: 3,
            mutation_genes: 1,
            seed: Some(1104),
        };
        let spaces = vec![GeneSpace::stepped(1.0, 200.0, 1.0), GeneSpace::range(0.0, 1.0)];
        let fitness = |genes: &[f64]| genes[0] * genes[1];

        let a = GeneticAlgorithm::new(spaces.clone(), settings.clone()).run(fitness).unwrap();
        let b = GeneticAlgorithm::new(spaces, settings).run(fitness).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nan_fitness_is_never_best() {
        let ga = GeneticAlgorithm::new(
            vec![GeneSpace::range(0.0, 1.0)],
            GeneticSettings {
                generations: 5,
                solutions: 6,
                parents_mating: 2,
                mutation_genes: 1,
                seed: Some(3),
            },
        );
        let solution = ga
            .run(|genes| if genes[0] < 0.5 { f64::NAN } else { genes[0] })
            .unwrap();
        assert!(solution.fitness >= 0.5);
    }

    #[test]
    fn test_empty_inputs() {
        let ga = GeneticAlgorithm::new(Vec::new(), GeneticSettings::default());
        assert!(ga.run(|_| 0.0).is_none());
    }
}
