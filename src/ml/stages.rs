// ============================================================
// Layer 5 — Optional Pipeline Stages
// ============================================================
// The network has three optional regularisation branches
// (batch norm, channel dropout, dropout). Each one is a Stage:
//
//   trait Stage { fn apply(&self, x, mode) -> x }
//
// and `Option<S>` is itself a Stage that passes x through when
// the branch was not built. The model therefore decides at
// construction time which stages exist, and its forward pass is
// the same straight line whatever the configuration.
//
// Mode is passed explicitly on every call instead of being
// derived from the backend, so the same module can be run in
// either mode on either backend.

use burn::{
    module::{Param, RunningState},
    prelude::*,
    tensor::Distribution,
};

// ─── Mode ─────────────────────────────────────────────────────────────────────
/// Whether a forward pass is part of training or evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dropout active, batch norm uses (and updates) batch statistics
    Train,
    /// Dropout is the identity, batch norm uses running statistics
    Eval,
}

// ─── Stage ────────────────────────────────────────────────────────────────────
/// One step of the forward pipeline whose behaviour may depend on the mode.
pub trait Stage<B: Backend, const D: usize> {
    fn apply(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D>;
}

impl<B: Backend, const D: usize, S: Stage<B, D>> Stage<B, D> for Option<S> {
    fn apply(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        match self {
            Some(stage) => stage.apply(x, mode),
            None        => x,
        }
    }
}

// ─── Dropout ──────────────────────────────────────────────────────────────────
/// Zeroes each activation with probability `prob` in training and
/// rescales survivors by 1 / (1 - prob).
///
/// `burn::nn::Dropout` keys training off `B::ad_enabled()`, which
/// cannot express `Mode::Train` on a non-autodiff backend.
#[derive(Module, Clone, Debug)]
pub struct Dropout {
    prob: f64,
}

impl Dropout {
    pub fn new(prob: f64) -> Self {
        assert!((0.0..1.0).contains(&prob), "dropout probability must be in [0, 1), got {prob}");
        Self { prob }
    }
}

impl<B: Backend, const D: usize> Stage<B, D> for Dropout {
    fn apply(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        if mode == Mode::Eval || self.prob == 0.0 {
            return x;
        }
        let keep = 1.0 - self.prob;
        let mask = x.random_like(Distribution::Bernoulli(keep));
        (x * mask).mul_scalar(1.0 / keep)
    }
}

// ─── ChannelDropout ───────────────────────────────────────────────────────────
/// Dropout over whole feature maps: for an input [N, C, H, W] each
/// of the N*C channels is either kept entirely or zeroed.
#[derive(Module, Clone, Debug)]
pub struct ChannelDropout {
    prob: f64,
}

impl ChannelDropout {
    pub fn new(prob: f64) -> Self {
        assert!((0.0..1.0).contains(&prob), "dropout probability must be in [0, 1), got {prob}");
        Self { prob }
    }
}

impl<B: Backend> Stage<B, 4> for ChannelDropout {
    fn apply(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        if mode == Mode::Eval || self.prob == 0.0 {
            return x;
        }
        let keep = 1.0 - self.prob;
        let [n, c, h, w] = x.dims();
        let mask = Tensor::<B, 4>::random([n, c, 1, 1], Distribution::Bernoulli(keep), &x.device())
            .expand([n, c, h, w]);
        (x * mask).mul_scalar(1.0 / keep)
    }
}

// ─── BatchNorm ────────────────────────────────────────────────────────────────
/// Per-channel batch normalisation for inputs shaped [N, C, ...].
/// Unlike `burn::nn::BatchNorm`, the statistics used follow `Mode`
/// rather than whether the backend tracks gradients.
///
/// `y = (x - mean) / sqrt(var + eps) * gamma + beta`
///
/// In `Mode::Train` mean/var come from the batch (biased variance)
/// and the running averages are updated with momentum, using the
/// unbiased variance. In `Mode::Eval` the running averages are used
/// and left untouched.
#[derive(Module, Debug)]
pub struct BatchNorm<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub running_mean: RunningState<Tensor<B, 1>>,
    pub running_var:  RunningState<Tensor<B, 1>>,
    momentum: f64,
    epsilon:  f64,
}

impl<B: Backend> BatchNorm<B> {
    /// Fresh layer: gamma = 1, beta = 0, running mean 0 / var 1.
    pub fn new(num_features: usize, device: &B::Device) -> Self {
        Self {
            gamma:        Param::from_tensor(Tensor::ones([num_features], device)),
            beta:         Param::from_tensor(Tensor::zeros([num_features], device)),
            running_mean: RunningState::new(Tensor::zeros([num_features], device)),
            running_var:  RunningState::new(Tensor::ones([num_features], device)),
            momentum: 0.1,
            epsilon:  1e-5,
        }
    }

    fn batch_statistics<const D: usize>(&self, x: &Tensor<B, D>) -> (Tensor<B, D>, Tensor<B, D>) {
        let dims     = x.dims();
        let channels = dims[1];
        let count: usize = dims.iter().enumerate().filter(|(i, _)| *i != 1).map(|(_, d)| d).product();

        let mut shape = [1; D];
        shape[1] = channels;

        let mean = x
            .clone()
            .swap_dims(0, 1)
            .reshape([channels, count])
            .mean_dim(1)
            .reshape(shape);

        let var = x
            .clone()
            .sub(mean.clone())
            .powf_scalar(2.0)
            .swap_dims(0, 1)
            .reshape([channels, count])
            .mean_dim(1)
            .reshape(shape);

        let unbiased = if count > 1 { count as f64 / (count - 1) as f64 } else { 1.0 };
        let device   = x.device();

        let running_mean = self.running_mean.value_sync().to_device(&device)
            .mul_scalar(1.0 - self.momentum)
            .add(mean.clone().detach().reshape([channels]).mul_scalar(self.momentum));
        let running_var = self.running_var.value_sync().to_device(&device)
            .mul_scalar(1.0 - self.momentum)
            .add(var.clone().detach().reshape([channels]).mul_scalar(self.momentum * unbiased));

        self.running_mean.update(running_mean.detach());
        self.running_var.update(running_var.detach());

        (mean, var)
    }
}

impl<B: Backend, const D: usize> Stage<B, D> for BatchNorm<B> {
    fn apply(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        let channels = x.dims()[1];
        let mut shape = [1; D];
        shape[1] = channels;

        let (mean, var) = match mode {
            Mode::Train => self.batch_statistics(&x),
            Mode::Eval  => {
                let device = x.device();
                (
                    self.running_mean.value_sync().to_device(&device).reshape(shape),
                    self.running_var.value_sync().to_device(&device).reshape(shape),
                )
            }
        };

        let std = var.add_scalar(self.epsilon).sqrt();
        x.sub(mean)
            .div(std)
            .mul(self.gamma.val().reshape(shape))
            .add(self.beta.val().reshape(shape))
    }
}
