// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Measures classification accuracy of a parameter snapshot on
// the test split.
//
// Evaluation is generic over a plain `Backend`, never an
// `AutodiffBackend`: the network built here cannot record a
// graph, so there is no gradient mode to switch on or off.
// Callers that train on `Autodiff<X>` evaluate on `X`.
//
// The test split is visited once, in dataset order, on the
// calling thread:
//   predicted = argmax(scores, dim 1)
//   correct  += count(predicted == target)
//   total    += batch size
//
// Reference: Burn Book §5 (Inference)

use burn::prelude::*;
use thiserror::Error;

use crate::data::{
    cifar10::CLASSES,
    dataset::NUM_CLASSES,
    provider::{DatasetProvider, Split},
};
use crate::domain::{
    accuracy::{AccuracyResult, AccuracyTally},
    snapshot::ParameterSnapshot,
    traits::StateDict,
};
use crate::ml::model::{ModelError, Net};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("the test split is empty")]
    EmptySplit,

    #[error("cannot read predictions back from the device: {0}")]
    Data(String),
}

/// Score `weights` on the whole test split.
pub fn evaluate<B: Backend>(
    weights:    &ParameterSnapshot,
    provider:   &DatasetProvider,
    batch_size: usize,
    device:     &B::Device,
) -> Result<AccuracyResult, EvalError> {
    let model  = Net::<B>::new(device).load_state_dict(weights)?;
    let loader = provider.batches::<B>(Split::Test, batch_size, None, 0);

    let mut tally = AccuracyTally::new();
    // (correct, total) per class
    let mut per_class = [(0usize, 0usize); NUM_CLASSES];

    for batch in loader.iter() {
        let [n] = batch.targets.dims();

        let scores    = model.forward(batch.images);
        let predicted = to_labels(scores.argmax(1).reshape([n]))?;
        let targets   = to_labels(batch.targets)?;

        let mut correct = 0;
        for (p, t) in predicted.iter().zip(&targets) {
            let class = *t as usize;
            per_class[class].1 += 1;
            if p == t {
                per_class[class].0 += 1;
                correct += 1;
            }
        }
        tally.record(correct, n);
    }

    let result = tally.finish().ok_or(EvalError::EmptySplit)?;

    for (name, (correct, total)) in CLASSES.iter().zip(per_class) {
        if total > 0 {
            tracing::debug!(
                "Accuracy for class {:>5}: {:.1} %",
                name,
                100.0 * correct as f64 / total as f64
            );
        }
    }
    println!("{result}");

    Ok(result)
}

fn to_labels<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<i64>, EvalError> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| EvalError::Data(format!("{e:?}")))
}
