//! AdamW optimizer (Adam with decoupled weight decay)

use super::param::Param;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// AdamW optimizer
///
/// Weight decay is applied to the parameters directly instead of being
/// folded into the gradient:
///
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr_t * m_t / (√v_t + ε)
///
/// The learning rate is passed per update so each parameter group can
/// follow its own schedule.
#[derive(Debug, Clone)]
pub struct AdamW {
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

/// Serializable AdamW state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamWState {
    pub t: u64,
    pub m: Vec<Option<Array1<f32>>>,
    pub v: Vec<Option<Array1<f32>>>,
}

impl AdamW {
    /// Create a new AdamW optimizer
    pub fn new(beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self { beta1, beta2, epsilon, weight_decay, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Default betas and epsilon with the given weight decay
    pub fn with_weight_decay(weight_decay: f32) -> Self {
        Self::new(0.9, 0.999, 1e-8, weight_decay)
    }

    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    /// Number of completed optimizer steps
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Start a new step; call once before the per-parameter updates
    pub fn begin_step(&mut self, num_params: usize) {
        if self.m.len() < num_params {
            self.m.resize(num_params, None);
            self.v.resize(num_params, None);
        }
        self.t += 1;
    }

    /// Update parameter `index` with its gradient at learning rate `lr`
    pub fn update(&mut self, index: usize, param: &mut Param, grad: &Array1<f32>, lr: f32) {
        // Bias correction factors
        let t = self.t.max(1) as i32;
        let lr_t = lr * ((1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t)));

        // m_t = β1 * m_{t-1} + (1 - β1) * g
        let m_t = match &self.m[index] {
            Some(m) => m * self.beta1 + grad * (1.0 - self.beta1),
            None => grad * (1.0 - self.beta1),
        };

        // v_t = β2 * v_{t-1} + (1 - β2) * g²
        let grad_sq = grad * grad;
        let v_t = match &self.v[index] {
            Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
            None => &grad_sq * (1.0 - self.beta2),
        };

        let adaptive_update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
        let weight_decay_factor = 1.0 - lr * self.weight_decay;
        param.data = &param.data * weight_decay_factor - &adaptive_update;

        self.m[index] = Some(m_t);
        self.v[index] = Some(v_t);
    }

    pub fn state(&self) -> AdamWState {
        AdamWState { t: self.t, m: self.m.clone(), v: self.v.clone() }
    }

    pub fn load(&mut self, state: AdamWState) {
        self.t = state.t;
        self.m = state.m;
        self.v = state.v;
    }
}
