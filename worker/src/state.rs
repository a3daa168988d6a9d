use std::num::NonZeroUsize;

use rand::Rng;
use rand_distr::StandardNormal;

/// Persistent buffers reused across rounds to avoid per-iteration
/// allocations.
///
/// The weight vector is owned exclusively by one node and mutated in place at
/// most once per round; the gradient buffer is overwritten each round by the
/// compute collaborator.
#[derive(Debug)]
pub struct NodeState {
    pub round: u64,

    /// Local model weights (flat).
    pub weights: Vec<f32>,

    /// Gradient buffer (flat).
    pub grads: Vec<f32>,
}

impl NodeState {
    /// Creates a state with standard-normal initialized weights.
    pub fn random(dim: NonZeroUsize) -> Self {
        let mut rng = rand::rng();
        let weights = (0..dim.get())
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Self::from_weights(weights)
    }

    /// Creates a state around explicit initial weights.
    pub fn from_weights(weights: Vec<f32>) -> Self {
        let grads = vec![0.0; weights.len()];
        Self {
            round: 0,
            weights,
            grads,
        }
    }

    #[inline]
    pub fn zero_grads(&mut self) {
        self.grads.fill(0.0);
    }

    #[inline]
    pub fn inc_round(&mut self) {
        self.round += 1;
    }

    /// Applies a received gradient in place: `w[k] -= lr * received[k]`.
    ///
    /// The update consumes the received gradient only; there is no averaging
    /// with the local gradient. Caller has already checked the lengths match.
    pub fn apply_update(&mut self, learning_rate: f32, received: &[f32]) {
        debug_assert_eq!(self.weights.len(), received.len());

        for (w, g) in self.weights.iter_mut().zip(received) {
            *w -= learning_rate * g;
        }
    }
}
