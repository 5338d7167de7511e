// ============================================================
// Layer 5 — Convolutional Network
// ============================================================
// LeNet-style classifier for 32×32 RGB images:
//
//   [N, 3, 32, 32]
//     conv1 5×5, 3→6    → relu → maxpool 2×2   [N, 6, 14, 14]
//     conv2 5×5, 6→16   → relu → maxpool 2×2   [N, 16, 5, 5]
//     flatten                                  [N, 400]
//     fc1 400→120 → relu
//     fc2 120→84  → relu
//     fc3 84→10                                [N, 10] class scores
//
// State-dict layout follows the usual convention for this
// network: linear weights are exported as [out, in], which is
// the transpose of Burn's internal [in, out] storage.
//
// Reference: Burn Book §3 (Building Blocks)
//            LeCun et al. (1998) Gradient-Based Learning

use std::collections::BTreeMap;

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
};
use thiserror::Error;

use crate::data::dataset::NUM_CLASSES;
use crate::domain::{
    snapshot::{ParameterSnapshot, SnapshotError, TensorSnapshot},
    traits::StateDict,
};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("cannot read values of parameter '{name}': {reason}")]
    Data { name: String, reason: String },
}

#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    conv1:      Conv2d<B>,
    conv2:      Conv2d<B>,
    pool:       MaxPool2d,
    fc1:        Linear<B>,
    fc2:        Linear<B>,
    fc3:        Linear<B>,
    activation: Relu,
}

impl<B: Backend> Net<B> {
    /// Freshly initialised network on `device`.
    /// Call `B::seed` beforehand for a reproducible initialisation.
    pub fn new(device: &B::Device) -> Self {
        Self {
            conv1:      Conv2dConfig::new([3, 6], [5, 5]).init(device),
            conv2:      Conv2dConfig::new([6, 16], [5, 5]).init(device),
            pool:       MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:        LinearConfig::new(16 * 5 * 5, 120).init(device),
            fc2:        LinearConfig::new(120, 84).init(device),
            fc3:        LinearConfig::new(84, NUM_CLASSES).init(device),
            activation: Relu::new(),
        }
    }

    /// images: [batch, 3, 32, 32] → class scores: [batch, 10]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.activation.forward(self.fc2.forward(x));
        self.fc3.forward(x)
    }

    fn device(&self) -> B::Device {
        self.fc3.weight.val().device()
    }
}

// ─── Snapshot export / import helpers ─────────────────────────────────────────

fn export<B: Backend, const D: usize>(
    snapshot: &mut ParameterSnapshot,
    name:     &str,
    tensor:   Tensor<B, D>,
) -> Result<(), ModelError> {
    let shape  = tensor.dims().to_vec();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ModelError::Data {
            name:   name.to_string(),
            reason: format!("{e:?}"),
        })?;
    snapshot.insert(name, shape, values)?;
    Ok(())
}

fn export_conv<B: Backend>(
    snapshot: &mut ParameterSnapshot,
    prefix:   &str,
    conv:     &Conv2d<B>,
) -> Result<(), ModelError> {
    export(snapshot, &format!("{prefix}.weight"), conv.weight.val())?;
    if let Some(bias) = &conv.bias {
        export(snapshot, &format!("{prefix}.bias"), bias.val())?;
    }
    Ok(())
}

fn export_linear<B: Backend>(
    snapshot: &mut ParameterSnapshot,
    prefix:   &str,
    linear:   &Linear<B>,
) -> Result<(), ModelError> {
    // [in, out] → [out, in]
    export(snapshot, &format!("{prefix}.weight"), linear.weight.val().transpose())?;
    if let Some(bias) = &linear.bias {
        export(snapshot, &format!("{prefix}.bias"), bias.val())?;
    }
    Ok(())
}

/// Remove `name` from an already validated snapshot and build a tensor from it.
fn import<B: Backend, const D: usize>(
    snapshot: &mut ParameterSnapshot,
    name:     &str,
    device:   &B::Device,
) -> Result<Tensor<B, D>, ModelError> {
    let (shape, values) = snapshot
        .take(name)
        .map(TensorSnapshot::into_parts)
        .ok_or_else(|| SnapshotError::MissingParameter(name.to_string()))?;
    let data = TensorData::new(values, shape).convert::<B::FloatElem>();
    Ok(Tensor::from_data(data, device))
}

fn import_conv<B: Backend>(
    mut conv: Conv2d<B>,
    snapshot: &mut ParameterSnapshot,
    prefix:   &str,
    device:   &B::Device,
) -> Result<Conv2d<B>, ModelError> {
    conv.weight = Param::from_tensor(import(snapshot, &format!("{prefix}.weight"), device)?);
    conv.bias   = Some(Param::from_tensor(import(snapshot, &format!("{prefix}.bias"), device)?));
    Ok(conv)
}

fn import_linear<B: Backend>(
    mut linear: Linear<B>,
    snapshot:   &mut ParameterSnapshot,
    prefix:     &str,
    device:     &B::Device,
) -> Result<Linear<B>, ModelError> {
    // [out, in] → [in, out]
    let weight: Tensor<B, 2> = import(snapshot, &format!("{prefix}.weight"), device)?;
    linear.weight = Param::from_tensor(weight.transpose());
    linear.bias   = Some(Param::from_tensor(import(snapshot, &format!("{prefix}.bias"), device)?));
    Ok(linear)
}

// ─── StateDict ────────────────────────────────────────────────────────────────

impl<B: Backend> StateDict for Net<B> {
    type Error = ModelError;

    fn parameter_shapes() -> BTreeMap<String, Vec<usize>> {
        [
            ("conv1.weight", vec![6, 3, 5, 5]),
            ("conv1.bias",   vec![6]),
            ("conv2.weight", vec![16, 6, 5, 5]),
            ("conv2.bias",   vec![16]),
            ("fc1.weight",   vec![120, 400]),
            ("fc1.bias",     vec![120]),
            ("fc2.weight",   vec![84, 120]),
            ("fc2.bias",     vec![84]),
            ("fc3.weight",   vec![NUM_CLASSES, 84]),
            ("fc3.bias",     vec![NUM_CLASSES]),
        ]
        .into_iter()
        .map(|(name, shape)| (name.to_string(), shape))
        .collect()
    }

    fn state_dict(&self) -> Result<ParameterSnapshot, ModelError> {
        let mut snapshot = ParameterSnapshot::new();
        export_conv(&mut snapshot, "conv1", &self.conv1)?;
        export_conv(&mut snapshot, "conv2", &self.conv2)?;
        export_linear(&mut snapshot, "fc1", &self.fc1)?;
        export_linear(&mut snapshot, "fc2", &self.fc2)?;
        export_linear(&mut snapshot, "fc3", &self.fc3)?;
        Ok(snapshot)
    }

    fn load_state_dict(self, snapshot: &ParameterSnapshot) -> Result<Self, ModelError> {
        // Validate everything before touching any layer
        snapshot.check_against(&Self::parameter_shapes())?;

        let device = self.device();
        let mut remaining = snapshot.clone();

        Ok(Self {
            conv1: import_conv(self.conv1, &mut remaining, "conv1", &device)?,
            conv2: import_conv(self.conv2, &mut remaining, "conv2", &device)?,
            fc1:   import_linear(self.fc1, &mut remaining, "fc1", &device)?,
            fc2:   import_linear(self.fc2, &mut remaining, "fc2", &device)?,
            fc3:   import_linear(self.fc3, &mut remaining, "fc3", &device)?,
            ..self
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let net    = Net::<TestBackend>::new(&device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(net.forward(images).dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_state_dict_matches_declared_shapes() {
        let device   = Default::default();
        let snapshot = Net::<TestBackend>::new(&device).state_dict().unwrap();
        assert_eq!(snapshot.shapes(), Net::<TestBackend>::parameter_shapes());
        // 456 + 2416 + 48120 + 10164 + 850
        assert_eq!(snapshot.num_values(), 62_006);
    }

    #[test]
    fn test_load_state_dict_round_trip() {
        let device = Default::default();
        let source = Net::<TestBackend>::new(&device).state_dict().unwrap();

        let loaded = Net::<TestBackend>::new(&device)
            .load_state_dict(&source)
            .unwrap()
            .state_dict()
            .unwrap();

        assert_eq!(loaded, source);
    }

    #[test]
    fn test_loaded_weights_drive_forward() {
        let device = Default::default();
        let a      = Net::<TestBackend>::new(&device);
        let b      = Net::<TestBackend>::new(&device)
            .load_state_dict(&a.state_dict().unwrap())
            .unwrap();

        let images = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let out_a  = a.forward(images.clone()).into_data().to_vec::<f32>().unwrap();
        let out_b  = b.forward(images).into_data().to_vec::<f32>().unwrap();
        for (x, y) in out_a.iter().zip(&out_b) {
            assert!((x - y).abs() < 1e-5, "{x} != {y}");
        }
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let device = Default::default();
        let mut snapshot = Net::<TestBackend>::new(&device).state_dict().unwrap();
        snapshot.insert("fc3.bias", vec![5], vec![0.0; 5]).unwrap();

        let err = Net::<TestBackend>::new(&device).load_state_dict(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Snapshot(SnapshotError::ShapeMismatch { ref name, .. }) if name == "fc3.bias"
        ));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let device = Default::default();
        let mut snapshot = Net::<TestBackend>::new(&device).state_dict().unwrap();
        snapshot.take("conv2.weight");

        let err = Net::<TestBackend>::new(&device).load_state_dict(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Snapshot(SnapshotError::MissingParameter(ref name)) if name == "conv2.weight"
        ));
    }
}
