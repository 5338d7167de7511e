// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageItem> into
// one ImageBatch of tensors on the target device.
//
//   Input:  N items, 3072 u8 pixels each (channel-major)
//   Output: images  [N, 3, 32, 32]  f32, normalised to [-1, 1]
//           targets [N]             int class labels
//
// Normalisation per channel: x = (p / 255 - mean) / std
// with mean = std = 0.5.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{ImageItem, CHANNELS, IMAGE_SIDE};

const MEAN: [f32; CHANNELS] = [0.5, 0.5, 0.5];
const STD: [f32; CHANNELS]  = [0.5, 0.5, 0.5];
const PLANE: usize = IMAGE_SIDE * IMAGE_SIDE;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch ready for the forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// Ground-truth class per image shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct ImageBatcher;

impl ImageBatcher {
    pub fn new() -> Self {
        Self
    }

    fn normalise(channel_index: usize, pixel: u8) -> f32 {
        let channel = channel_index / PLANE;
        (pixel as f32 / 255.0 - MEAN[channel]) / STD[channel]
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();

        // Items are already channel-major, so flattening them in order
        // gives [N, C, H, W] row-major data directly
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| {
                item.pixels
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| Self::normalise(i, p))
            })
            .collect();

        let labels: Vec<B::IntElem> = items
            .iter()
            .map(|item| (item.label as i64).elem::<B::IntElem>())
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, CHANNELS, IMAGE_SIDE, IMAGE_SIDE])
                .convert::<B::FloatElem>(),
            device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::IMAGE_BYTES;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let items  = vec![
            ImageItem::new(vec![0; IMAGE_BYTES], 1),
            ImageItem::new(vec![255; IMAGE_BYTES], 4),
            ImageItem::new(vec![128; IMAGE_BYTES], 9),
        ];

        let batch: ImageBatch<TestBackend> = ImageBatcher::new().batch(items, &device);

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);

        let targets = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![1, 4, 9]);
    }

    #[test]
    fn test_pixels_are_scaled_to_unit_range() {
        let device = Default::default();
        let items  = vec![
            ImageItem::new(vec![0; IMAGE_BYTES], 0),
            ImageItem::new(vec![255; IMAGE_BYTES], 0),
        ];

        let batch: ImageBatch<TestBackend> = ImageBatcher::new().batch(items, &device);
        let values = batch.images.into_data().convert::<f32>().to_vec::<f32>().unwrap();

        assert!(values[..IMAGE_BYTES].iter().all(|&v| (v + 1.0).abs() < 1e-6));
        assert!(values[IMAGE_BYTES..].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }
}
