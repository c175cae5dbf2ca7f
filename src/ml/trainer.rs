// ============================================================
// Layer 5 — Training and Evaluation Loops
// ============================================================
// train_epoch: one pass over the shuffled training batches on
//   the autodiff backend. Every step is
//     forward (Mode::Train) → mean NLL → backward → SGD step
//   Gradients are produced fresh by each backward() call, so
//   nothing accumulates across steps.
//
// evaluate: one pass over the test batches with the model moved
//   to the inner backend by model.valid() (no autodiff graph)
//   and Mode::Eval (no dropout, running batch-norm statistics).
//   Loss is summed per sample and divided by the sample count.

use burn::{
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::MnistBatch;
use crate::domain::metrics::{train_step_counter, MetricsRecord};
use crate::ml::model::{nll_loss, Net, Reduction};
use crate::ml::stages::Mode;

/// Fixed facts about one training epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochPlan {
    /// 1-based epoch number
    pub epoch:         usize,
    pub learning_rate: f64,
    pub batch_size:    usize,
    /// Log every `log_interval`-th batch (0-indexed)
    pub log_interval:  usize,
    /// Samples in the training partition
    pub train_len:     usize,
    /// Batches the loader yields per epoch
    pub num_batches:   usize,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalSummary {
    /// Summed NLL divided by `total`
    pub avg_loss: f64,
    pub correct:  usize,
    pub total:    usize,
    pub batches:  usize,
}

impl EvalSummary {
    /// 100 * correct / total (0 for an empty partition)
    pub fn accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.total as f64
        }
    }
}

pub fn train_epoch<B, O>(
    mut model: Net<B>,
    optim:     &mut O,
    batches:   impl Iterator<Item = MnistBatch<B>>,
    plan:      &EpochPlan,
    record:    &mut MetricsRecord,
) -> Net<B>
where
    B: AutodiffBackend,
    O: Optimizer<Net<B>, B>,
{
    for (batch_index, batch) in batches.enumerate() {
        let batch_len = batch.len();
        let (loss, _) = model.forward_loss(batch, Mode::Train);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(plan.learning_rate, model, grads);

        if batch_index % plan.log_interval == 0 {
            println!(
                "Train Epoch: {} [{}/{} ({:.0}%)]\tLoss: {:.6}",
                plan.epoch,
                batch_index * batch_len,
                plan.train_len,
                100.0 * batch_index as f64 / plan.num_batches as f64,
                loss_val,
            );
            record.record_train(
                train_step_counter(plan.epoch, batch_index, plan.batch_size, plan.train_len),
                loss_val,
            );
        }
    }

    tracing::debug!("Epoch {} finished", plan.epoch);
    model
}

pub fn evaluate<B: Backend>(
    model:   &Net<B>,
    batches: impl Iterator<Item = MnistBatch<B>>,
    record:  &mut MetricsRecord,
) -> EvalSummary {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut total    = 0usize;
    let mut count    = 0usize;

    for batch in batches {
        let output  = model.forward(batch.images, Mode::Eval);
        let targets = batch.targets;
        total += targets.dims()[0];
        count += 1;

        loss_sum += nll_loss(output.clone(), targets.clone(), Reduction::Sum)
            .into_scalar()
            .elem::<f64>();

        // argmax(1) returns shape [batch, 1] — flatten to [batch]
        let pred = output.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = pred.equal(targets).int().sum().into_scalar().elem::<i64>();
        correct += hits as usize;
    }

    let avg_loss = if total > 0 { loss_sum / total as f64 } else { f64::NAN };
    record.record_test(avg_loss);

    let summary = EvalSummary { avg_loss, correct, total, batches: count };
    println!(
        "\nTest set: Avg. loss: {:.4}, Accuracy: {}/{} ({:.0}%)\n",
        summary.avg_loss,
        summary.correct,
        summary.total,
        summary.accuracy_pct(),
    );
    summary
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;
    use burn::module::AutodiffModule;
    use burn::optim::{momentum::MomentumConfig, SgdConfig};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::data::batcher::MnistBatcher;
    use crate::domain::sample::{DigitSample, IMAGE_PIXELS};
    use crate::ml::model::NetConfig;
    use crate::ml::test_support::lock_backend_rng;

    type TestBackend         = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn samples(n: usize, seed: u64) -> Vec<DigitSample> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let pixels = (0..IMAGE_PIXELS).map(|_| rng.gen::<u8>()).collect();
                DigitSample::new(pixels, rng.gen_range(0..10))
            })
            .collect()
    }

    fn batches<B: Backend>(items: &[DigitSample], size: usize) -> Vec<MnistBatch<B>> {
        let device: B::Device = Default::default();
        items
            .chunks(size)
            .map(|chunk| MnistBatcher::default().batch(chunk.to_vec(), &device))
            .collect()
    }

    #[test]
    fn test_evaluate_counts_ten_batches_of_thousand() {
        let _guard = lock_backend_rng();
        let device = Default::default();
        let net: Net<TestBackend> = NetConfig::new().init(&device);
        let items: Vec<DigitSample> = (0..10_000)
            .map(|i| DigitSample::new(vec![0; IMAGE_PIXELS], (i % 10) as u8))
            .collect();

        let mut record = MetricsRecord::default();
        let summary = evaluate(&net, batches::<TestBackend>(&items, 1000).into_iter(), &mut record);

        assert_eq!(summary.batches, 10);
        assert_eq!(summary.total, 10_000);
        assert!(summary.correct <= summary.total);
        // identical images → one predicted class → exactly a tenth correct
        assert_eq!(summary.correct, 1_000);
        assert_eq!(summary.accuracy_pct(), 10.0);
        assert_eq!(record.test_losses, vec![summary.avg_loss]);
    }

    #[test]
    fn test_accuracy_percentage() {
        let s = EvalSummary { avg_loss: 0.1, correct: 9_871, total: 10_000, batches: 10 };
        assert!((s.accuracy_pct() - 98.71).abs() < 1e-9);
        let empty = EvalSummary { avg_loss: f64::NAN, correct: 0, total: 0, batches: 0 };
        assert_eq!(empty.accuracy_pct(), 0.0);
    }

    #[test]
    fn test_train_epoch_logs_every_interval() {
        let _guard = lock_backend_rng();
        let device = Default::default();
        <TestAutodiffBackend as Backend>::seed(&device, 7);

        let model: Net<TestAutodiffBackend> = NetConfig::new().init(&device);
        let mut optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new().with_momentum(0.5).with_dampening(0.0)))
            .init();

        let items = samples(12 * 4, 3);
        let plan  = EpochPlan {
            epoch:         2,
            learning_rate: 0.01,
            batch_size:    4,
            log_interval:  5,
            train_len:     items.len(),
            num_batches:   12,
        };

        let mut record = MetricsRecord::default();
        let _ = train_epoch(model, &mut optim, batches::<TestAutodiffBackend>(&items, 4).into_iter(), &plan, &mut record);

        // batches 0, 5, 10
        assert_eq!(record.train_counter, vec![48, 48 + 20, 48 + 40]);
        assert_eq!(record.train_losses.len(), 3);
        assert!(record.train_losses.iter().all(|l| l.is_finite() && *l > 0.0));
    }

    #[test]
    fn test_training_lowers_loss_on_a_fixed_batch() {
        let _guard = lock_backend_rng();
        let device = Default::default();
        <TestAutodiffBackend as Backend>::seed(&device, 11);

        let mut model: Net<TestAutodiffBackend> = NetConfig::plain().init(&device);
        let mut optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new().with_momentum(0.5).with_dampening(0.0)))
            .init();

        let items = samples(16, 5);
        let mut record = MetricsRecord::default();
        let before = evaluate(&model.valid(), batches::<TestBackend>(&items, 16).into_iter(), &mut record);

        for epoch in 1..=20 {
            let plan = EpochPlan {
                epoch,
                learning_rate: 0.05,
                batch_size:    16,
                log_interval:  10,
                train_len:     16,
                num_batches:   1,
            };
            model = train_epoch(model, &mut optim, batches::<TestAutodiffBackend>(&items, 16).into_iter(), &plan, &mut record);
        }

        let after = evaluate(&model.valid(), batches::<TestBackend>(&items, 16).into_iter(), &mut record);
        assert!(after.avg_loss < before.avg_loss, "{} !< {}", after.avg_loss, before.avg_loss);
    }
}
