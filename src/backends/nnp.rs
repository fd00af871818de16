//! Call contract of the NNPACK-style kernel library.
//!
//! The geometry structs are `#[repr(C)]` and keep the field order of the
//! native ABI, so an FFI-backed `KernelLibrary` can hand them over as is.

use rayon::ThreadPool;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(height: usize, width: usize) -> Size {
        Size { width, height }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub(crate) fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Implicit zero padding, in the library's top/right/bottom/left layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl Padding {
    /// Builds the padding from per-side values given in top/bottom/left/right order.
    pub fn from_tblr(top: usize, bottom: usize, left: usize, right: usize) -> Padding {
        Padding {
            top,
            right,
            bottom,
            left,
        }
    }

    pub(crate) fn fits_within(&self, window: &Size) -> bool {
        self.top < window.height
            && self.bottom < window.height
            && self.left < window.width
            && self.right < window.width
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvolutionAlgorithm {
    Auto = 0,
    Ft8x8 = 1,
    Ft16x16 = 2,
    Wt8x8 = 3,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformStrategy {
    BlockBased = 1,
    TupleBased = 2,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    InvalidBatchSize = 2,
    InvalidChannels = 3,
    InvalidInputChannels = 4,
    InvalidOutputChannels = 5,
    InvalidInputSize = 10,
    InvalidInputStride = 11,
    InvalidInputPadding = 12,
    InvalidKernelSize = 13,
    InvalidPoolingSize = 14,
    InvalidPoolingStride = 15,
    InvalidAlgorithm = 16,
    InvalidTransformStrategy = 17,
    InvalidOutputSubsampling = 18,
    InvalidBufferSize = 19,
    UnsupportedInputSize = 20,
    UnsupportedInputStride = 21,
    UnsupportedInputPadding = 22,
    UnsupportedKernelSize = 23,
    UnsupportedPoolingSize = 24,
    UnsupportedPoolingStride = 25,
    UnsupportedAlgorithm = 27,
    UnsupportedHardware = 51,
    Uninitialized = 52,
}

/// Scratch memory for the inference path, reusable across calls.
#[derive(Debug, Default)]
pub struct Workspace {
    pub(crate) buffer: Vec<f32>,
}

impl Workspace {
    pub fn new() -> Workspace {
        Workspace::default()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

/// Geometry shared by both convolution entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    pub input_channels: usize,
    pub output_channels: usize,
    pub input_size: Size,
    pub input_padding: Padding,
    pub kernel_size: Size,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolGeometry {
    pub batch_size: usize,
    pub channels: usize,
    pub input_size: Size,
    pub input_padding: Padding,
    pub pooling_size: Size,
    pub pooling_stride: Size,
}

/// The four entry points every kernel library has to provide.
///
/// Tensors are passed as flat NCHW buffers (filters as MCHW). Calls block
/// until the whole result has been written into `output`; work is spread over
/// the provided pool.
pub trait KernelLibrary: Send + Sync {
    fn initialize(&self) -> Status;

    fn convolution_inference(
        &self,
        algorithm: ConvolutionAlgorithm,
        strategy: TransformStrategy,
        geometry: &ConvGeometry,
        output_subsampling: Size,
        input: &[f32],
        kernel: &[f32],
        bias: &[f32],
        output: &mut [f32],
        pool: &ThreadPool,
        workspace: Option<&mut Workspace>,
    ) -> Status;

    fn convolution_output(
        &self,
        algorithm: ConvolutionAlgorithm,
        batch_size: usize,
        geometry: &ConvGeometry,
        input: &[f32],
        kernel: &[f32],
        bias: &[f32],
        output: &mut [f32],
        pool: &ThreadPool,
    ) -> Status;

    fn max_pooling_output(
        &self,
        geometry: &PoolGeometry,
        input: &[f32],
        output: &mut [f32],
        pool: &ThreadPool,
    ) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_from_tblr() {
        let padding = Padding::from_tblr(1, 2, 3, 4);
        assert_eq!(
            padding,
            Padding {
                top: 1,
                right: 4,
                bottom: 2,
                left: 3
            }
        );
    }

    #[test]
    fn test_padding_fits_within() {
        let window = Size::new(2, 3);
        assert!(Padding::from_tblr(1, 1, 2, 2).fits_within(&window));
        assert!(!Padding::from_tblr(2, 0, 0, 0).fits_within(&window));
        assert!(!Padding::from_tblr(0, 0, 0, 3).fits_within(&window));
    }
}
