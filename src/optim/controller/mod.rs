//! Optimization controller
//!
//! Owns everything that turns a gradient into a parameter update: the
//! per-group schedules and freeze flags, AdamW with decoupled weight decay,
//! gradient clipping, fp16 loss scaling, the non-finite step policy and the
//! hard `total_steps` budget.


use super::adamw::{AdamW, AdamWState};
use super::clip::{clip_grad_norm, clip_grad_value};
use super::param::{GroupKind, Gradients, Param};
use super::scheduler::{build_scheduler, LRScheduler};
use crate::config::{ClipAlgorithm, GroupFreeze, GroupLr, LrSchedulerKind, TrainSpec};
use crate::error::{Error, Result};
use crate::precision::{GradScaler, MixedPrecisionConfig, Precision, ScalerState};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Controller settings
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub total_steps: u64,
    pub weight_decay: f32,
    pub lr: GroupLr,
    pub freeze: GroupFreeze,
    pub lr_scheduler: LrSchedulerKind,
    pub pct_start: f32,
    pub clip_value: f32,
    pub clip_algorithm: ClipAlgorithm,
    pub max_consecutive_nonfinite: usize,
    pub precision: Precision,
}

impl ControllerConfig {
    pub fn from_spec(spec: &TrainSpec) -> Self {
        let opt = &spec.optimizer_config;
        Self {
            total_steps: opt.total_steps,
            weight_decay: opt.weight_decay,
            lr: opt.lr,
            freeze: opt.freeze,
            lr_scheduler: opt.lr_scheduler,
            pct_start: opt.pct_start,
            clip_value: spec.gradient_clip_val,
            clip_algorithm: spec.gradient_clip_algorithm,
            max_consecutive_nonfinite: spec.max_consecutive_nonfinite,
            precision: spec.precision,
        }
    }

    pub fn is_frozen(&self, group: GroupKind) -> bool {
        match group {
            GroupKind::Backbone => self.freeze.backbone,
            GroupKind::Head => self.freeze.head,
        }
    }

    pub fn group_lr(&self, group: GroupKind) -> f32 {
        match group {
            GroupKind::Backbone => self.lr.backbone,
            GroupKind::Head => self.lr.head,
        }
    }
}

/// Result of one call to [`OptimizationController::step`]
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Parameters were updated
    Applied {
        /// Global gradient norm before clipping
        grad_norm: f32,
        /// Learning rate used per group, in `GroupKind::ALL` order
        lr: [f32; 2],
    },
    /// Scaled fp16 gradients overflowed; the loss scale backed off
    ScaleOverflow { scale: f32 },
    /// The step budget is used up; nothing was changed
    BudgetExhausted,
}

/// Serializable controller state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSnapshot {
    /// Steps consumed from the budget
    pub step: u64,
    pub adamw: AdamWState,
    pub consecutive_nonfinite: usize,
    pub total_nonfinite: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ScalerState>,
}

/// Drives parameter updates for the backbone and head groups
pub struct OptimizationController {
    config: ControllerConfig,
    optimizer: AdamW,
    schedulers: [Box<dyn LRScheduler>; 2],
    scaler: Option<GradScaler>,
    step: u64,
    consecutive_nonfinite: usize,
    total_nonfinite: u64,
}

impl OptimizationController {
    pub fn new(config: ControllerConfig) -> Self {
        let schedulers = GroupKind::ALL.map(|group| {
            build_scheduler(config.lr_scheduler, config.group_lr(group), config.total_steps, config.pct_start)
        });
        let mp = MixedPrecisionConfig::for_precision(config.precision);
        let scaler = mp.needs_scaler().then(|| GradScaler::from_config(&mp));
        Self {
            optimizer: AdamW::with_weight_decay(config.weight_decay),
            schedulers,
            scaler,
            step: 0,
            consecutive_nonfinite: 0,
            total_nonfinite: 0,
            config,
        }
    }

    pub fn from_spec(spec: &TrainSpec) -> Self {
        Self::new(ControllerConfig::from_spec(spec))
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Steps consumed so far
    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    pub fn is_exhausted(&self) -> bool {
        self.step >= self.config.total_steps
    }

    /// Current learning rate of a group
    pub fn lr(&self, group: GroupKind) -> f32 {
        self.schedulers[group.index()].get_lr()
    }

    pub fn loss_scale(&self) -> Option<f32> {
        self.scaler.as_ref().map(GradScaler::scale)
    }

    pub fn consecutive_nonfinite(&self) -> usize {
        self.consecutive_nonfinite
    }

    pub fn total_nonfinite(&self) -> u64 {
        self.total_nonfinite
    }

    /// Consume one step of the budget and update the non-frozen parameters
    ///
    /// A non-finite loss or gradient drops the step and returns
    /// `Error::NonFiniteGradient`; once more than
    /// `max_consecutive_nonfinite` steps in a row were dropped it returns
    /// `Error::NonFiniteTolerance` instead.
    pub fn step(&mut self, total_loss: f64, params: &mut [Param], mut grads: Gradients) -> Result<StepOutcome> {
        if self.is_exhausted() {
            return Ok(StepOutcome::BudgetExhausted);
        }
        if !grads.matches(params) {
            return Err(Error::Model(format!(
                "gradient shapes do not match {} parameters",
                params.len()
            )));
        }
        self.step += 1;
        let step = self.step;

        if !total_loss.is_finite() || !grads.is_finite() {
            return Err(self.drop_nonfinite(step));
        }

        if let Some(scaler) = self.scaler.as_mut() {
            let scale = scaler.scale();
            let mut valid = true;
            for grad in grads.as_mut_slice() {
                grad.mapv_inplace(|g| Precision::Fp16.quantize(g * scale));
                valid &= unscale(scaler, grad);
            }
            scaler.update(valid);
            if !valid {
                let new_scale = scaler.scale();
                tracing::debug!(step, scale, new_scale, "fp16 gradient overflow, backing off loss scale");
                self.advance_schedules();
                return Ok(StepOutcome::ScaleOverflow { scale: new_scale });
            }
        }
        self.consecutive_nonfinite = 0;

        // Frozen groups take no part in clipping or the update
        let trainable: Vec<usize> = (0..params.len())
            .filter(|&i| !self.config.is_frozen(params[i].group))
            .collect();
        let mut trainable_grads: Vec<Array1<f32>> = trainable
            .iter()
            .map(|&i| grads.as_slice()[i].clone())
            .collect();
        let grad_norm = match self.config.clip_algorithm {
            ClipAlgorithm::Norm => clip_grad_norm(&mut trainable_grads, self.config.clip_value),
            ClipAlgorithm::Value => clip_grad_value(&mut trainable_grads, self.config.clip_value),
        };

        let lr = GroupKind::ALL.map(|group| self.lr(group));
        self.optimizer.begin_step(params.len());
        for (&i, grad) in trainable.iter().zip(&trainable_grads) {
            let group_lr = lr[params[i].group.index()];
            self.optimizer.update(i, &mut params[i], grad, group_lr);
        }
        self.advance_schedules();

        Ok(StepOutcome::Applied { grad_norm, lr })
    }

    fn drop_nonfinite(&mut self, step: u64) -> Error {
        self.consecutive_nonfinite += 1;
        self.total_nonfinite += 1;
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.update(false);
        }
        self.advance_schedules();
        if self.consecutive_nonfinite > self.config.max_consecutive_nonfinite {
            Error::NonFiniteTolerance {
                step,
                count: self.consecutive_nonfinite,
                tolerance: self.config.max_consecutive_nonfinite,
            }
        } else {
            Error::NonFiniteGradient { step }
        }
    }

    fn advance_schedules(&mut self) {
        for scheduler in &mut self.schedulers {
            scheduler.step();
        }
    }

    pub fn state(&self) -> OptimizerSnapshot {
        OptimizerSnapshot {
            step: self.step,
            adamw: self.optimizer.state(),
            consecutive_nonfinite: self.consecutive_nonfinite,
            total_nonfinite: self.total_nonfinite,
            scaler: self.scaler.as_ref().map(GradScaler::state),
        }
    }

    pub fn load(&mut self, snapshot: OptimizerSnapshot) {
        self.step = snapshot.step;
        self.consecutive_nonfinite = snapshot.consecutive_nonfinite;
        self.total_nonfinite = snapshot.total_nonfinite;
        self.optimizer.load(snapshot.adamw);
        for scheduler in &mut self.schedulers {
            scheduler.set_step(snapshot.step);
        }
        if let (Some(scaler), Some(state)) = (self.scaler.as_mut(), snapshot.scaler.as_ref()) {
            scaler.load(state);
        }
    }
}

fn unscale(scaler: &GradScaler, grad: &mut Array1<f32>) -> bool {
    match grad.as_slice_mut() {
        Some(slice) => scaler.unscale_and_check(slice),
        None => {
            let inv = 1.0 / scaler.scale();
            grad.mapv_inplace(|g| g * inv);
            grad.iter().all(|g| g.is_finite())
        }
    }
}
