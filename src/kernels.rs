//! Convolution kernel weight generators for the post-processing passes.
//!
//! Generators return owned weight vectors; the renderer borrows them through
//! a [`ConvolutionKernel`] view for upload. Weights are not pre-normalized,
//! the post-processing shader divides by the weight sum.

use thiserror::Error;

use crate::shader_types::ConvolutionKernel;

/// Largest kernel side length the renderer's weight buffer accepts.
pub const MAX_KERNEL_SIZE: usize = 35;

/// Rejection reasons for a malformed kernel descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    #[error("kernel size {0} is not a positive odd number")]
    InvalidSize(i32),
    #[error("kernel declares {expected} weights but carries {actual}")]
    WeightCountMismatch { expected: usize, actual: usize },
    #[error("kernel size {0} exceeds the maximum of {MAX_KERNEL_SIZE}")]
    TooLarge(i32),
}

/// Checks the descriptor invariants: `size` is positive and odd, within
/// bounds, and `size * size` matches the weight count.
pub fn validate(kernel: &ConvolutionKernel<'_>) -> Result<(), KernelError> {
    if kernel.size <= 0 || kernel.size % 2 == 0 {
        return Err(KernelError::InvalidSize(kernel.size));
    }
    if kernel.size as usize > MAX_KERNEL_SIZE {
        return Err(KernelError::TooLarge(kernel.size));
    }
    let expected = (kernel.size * kernel.size) as usize;
    if kernel.mat.len() != expected {
        return Err(KernelError::WeightCountMismatch {
            expected,
            actual: kernel.mat.len(),
        });
    }
    Ok(())
}

/// Uniform box filter weights.
pub fn box_blur(size: usize) -> Vec<f32> {
    vec![1.0; size * size]
}

/// Gaussian weights with sigma of half the side length, centered on the
/// middle tap.
pub fn gaussian_blur(size: usize) -> Vec<f32> {
    let sigma = size as f32 / 2.0;
    let half = (size / 2) as i32;
    let mut weights = Vec::with_capacity(size * size);
    for row in -half..=half {
        for col in -half..=half {
            let numerator = -((row * row + col * col) as f32);
            let denominator = 2.0 * sigma * sigma;
            weights.push((numerator / denominator).exp());
        }
    }
    weights
}

/// Unsharp-mask weights: a negative box around an amplified center tap.
/// The weights sum to one, so the filter preserves overall brightness.
pub fn sharpen(size: usize) -> Vec<f32> {
    let count = size * size;
    let surround = -1.0 / count as f32;
    let mut weights = vec![surround; count];
    weights[count / 2] = 2.0 + surround;
    weights
}

/// Maps a normalized slider value in `[0, 1)` to an odd kernel size no
/// larger than `max_size`.
pub fn scale_kernel_size(value: f32, max_size: usize) -> usize {
    let max_even = (max_size.max(1) - 1) as f32;
    let scaled = value.clamp(0.0, 1.0) * max_even;
    let remainder = scaled % 2.0;
    (scaled - remainder) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_match_their_declared_size() {
        for size in [1usize, 3, 5, 11] {
            assert_eq!(box_blur(size).len(), size * size);
            assert_eq!(gaussian_blur(size).len(), size * size);
            assert_eq!(sharpen(size).len(), size * size);
        }
    }

    #[test]
    fn generated_kernels_validate() {
        let weights = gaussian_blur(5);
        let kernel = ConvolutionKernel {
            size: 5,
            mat: &weights,
        };
        assert_eq!(validate(&kernel), Ok(()));
    }

    #[test]
    fn even_and_non_positive_sizes_are_rejected() {
        let weights = box_blur(4);
        let kernel = ConvolutionKernel {
            size: 4,
            mat: &weights,
        };
        assert_eq!(validate(&kernel), Err(KernelError::InvalidSize(4)));

        let kernel = ConvolutionKernel { size: 0, mat: &[] };
        assert_eq!(validate(&kernel), Err(KernelError::InvalidSize(0)));
        let kernel = ConvolutionKernel {
            size: -3,
            mat: &[],
        };
        assert_eq!(validate(&kernel), Err(KernelError::InvalidSize(-3)));
    }

    #[test]
    fn weight_count_mismatch_is_rejected() {
        let weights = box_blur(3);
        let kernel = ConvolutionKernel {
            size: 5,
            mat: &weights,
        };
        assert_eq!(
            validate(&kernel),
            Err(KernelError::WeightCountMismatch {
                expected: 25,
                actual: 9,
            })
        );
    }

    #[test]
    fn oversized_kernels_are_rejected() {
        let size = MAX_KERNEL_SIZE + 2;
        let weights = box_blur(size);
        let kernel = ConvolutionKernel {
            size: size as i32,
            mat: &weights,
        };
        assert_eq!(validate(&kernel), Err(KernelError::TooLarge(37)));
    }

    #[test]
    fn gaussian_peaks_at_the_center_and_is_symmetric() {
        let size = 7;
        let weights = gaussian_blur(size);
        let center = weights[size * size / 2];
        for (i, &weight) in weights.iter().enumerate() {
            assert!(weight <= center);
            assert!((weight - weights[size * size - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn sharpen_weights_sum_to_one() {
        for size in [3usize, 5, 9] {
            let sum: f32 = sharpen(size).iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn scaled_sizes_are_odd_and_bounded() {
        for step in 0..=20 {
            let value = step as f32 / 20.0;
            let size = scale_kernel_size(value, MAX_KERNEL_SIZE);
            assert_eq!(size % 2, 1);
            assert!(size >= 1 && size <= MAX_KERNEL_SIZE);
        }
        assert_eq!(scale_kernel_size(0.0, 19), 1);
        assert_eq!(scale_kernel_size(1.0, 19), 19);
    }
}
