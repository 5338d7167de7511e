// ============================================================
// Layer 4 — Synthetic Image Set
// ============================================================
// A seeded, in-memory stand-in for CIFAR-10 with the same image
// geometry and ten balanced classes. Each class has its own
// base colour; every pixel is that colour plus uniform noise,
// so the classes are separable but not trivially identical.
//
// Used for offline runs (`--synthetic`) and by the test suite.
//
// Reference: rand crate documentation (StdRng, SeedableRng)

use burn::data::dataset::InMemDataset;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::{ImageDataset, ImageItem, CHANNELS, IMAGE_BYTES, NUM_CLASSES};

const PLANE: usize = IMAGE_BYTES / CHANNELS;
const NOISE: i16 = 40;

/// Base RGB colour of a class
fn class_colour(label: usize) -> [u8; CHANNELS] {
    [
        ((label * 97 + 23) % 256) as u8,
        ((label * 53 + 141) % 256) as u8,
        ((label * 181 + 67) % 256) as u8,
    ]
}

/// Generate `len` images, labels cycling 0, 1, …, 9, 0, …
/// The same `(len, seed)` always yields the same dataset.
pub fn generate(len: usize, seed: u64) -> ImageDataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let items = (0..len)
        .map(|i| {
            let label  = i % NUM_CLASSES;
            let colour = class_colour(label);
            let mut pixels = Vec::with_capacity(IMAGE_BYTES);
            for base in colour {
                for _ in 0..PLANE {
                    let noisy = base as i16 + rng.gen_range(-NOISE..=NOISE);
                    pixels.push(noisy.clamp(0, 255) as u8);
                }
            }
            ImageItem::new(pixels, label as u8)
        })
        .collect();

    InMemDataset::new(items)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;

    #[test]
    fn test_same_seed_same_data() {
        let a = generate(12, 7);
        let b = generate(12, 7);
        for i in 0..12 {
            assert_eq!(a.get(i), b.get(i));
        }
    }

    #[test]
    fn test_different_seed_different_pixels() {
        let a = generate(1, 1).get(0).unwrap();
        let b = generate(1, 2).get(0).unwrap();
        assert_eq!(a.label, b.label);
        assert_ne!(a.pixels, b.pixels);
    }

    #[test]
    fn test_classes_are_balanced() {
        let ds = generate(50, 0);
        let mut counts = [0usize; NUM_CLASSES];
        for i in 0..ds.len() {
            counts[ds.get(i).unwrap().label as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c == 5));
    }

    #[test]
    fn test_image_geometry() {
        let item = generate(1, 3).get(0).unwrap();
        assert_eq!(item.pixels.len(), IMAGE_BYTES);
    }
}
