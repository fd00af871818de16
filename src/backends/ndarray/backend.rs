use ndarray::{s, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut2, ShapeError};
use rayon::prelude::*;
use rayon::ThreadPool;

use super::convnets::{conv2d_image, max_pool2d_plane, Conv2dPlan};
use crate::backends::convnets::{conv2d_output_size, pool2d_output_size};
use crate::backends::nnp::{
    ConvGeometry, ConvolutionAlgorithm, KernelLibrary, PoolGeometry, Size, Status,
    TransformStrategy, Workspace,
};

/// Portable `KernelLibrary` built on `ndarray` and `rayon`.
///
/// Convolutions are lowered to im2col + GEMM, pooling walks each plane
/// directly. It keeps the restrictions of the native library (algorithm
/// applicability, 2x2/2 max pooling only) so that it can stand in for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NdArrayKernels;

impl NdArrayKernels {
    pub fn new() -> NdArrayKernels {
        NdArrayKernels
    }
}

fn into_status(result: Result<(), Status>) -> Status {
    match result {
        Ok(()) => Status::Success,
        Err(status) => status,
    }
}

fn check(cond: bool, status: Status) -> Result<(), Status> {
    if cond {
        Ok(())
    } else {
        Err(status)
    }
}

fn check_conv_geometry(
    batch_size: usize,
    geometry: &ConvGeometry,
    subsampling: &Size,
) -> Result<Size, Status> {
    check(batch_size > 0, Status::InvalidBatchSize)?;
    check(geometry.input_channels > 0, Status::InvalidInputChannels)?;
    check(geometry.output_channels > 0, Status::InvalidOutputChannels)?;
    check(!geometry.input_size.is_empty(), Status::InvalidInputSize)?;
    check(!geometry.kernel_size.is_empty(), Status::InvalidKernelSize)?;
    check(!subsampling.is_empty(), Status::InvalidOutputSubsampling)?;
    check(
        geometry.input_padding.fits_within(&geometry.kernel_size),
        Status::InvalidInputPadding,
    )?;
    conv2d_output_size(
        &geometry.input_size,
        &geometry.kernel_size,
        subsampling,
        &geometry.input_padding,
    )
    .ok_or(Status::InvalidInputSize)
}

fn check_algorithm(
    algorithm: ConvolutionAlgorithm,
    kernel_size: &Size,
    subsampling: &Size,
) -> Result<(), Status> {
    let unit_subsampling = subsampling.height == 1 && subsampling.width == 1;
    let fits = |tile: usize| kernel_size.height <= tile && kernel_size.width <= tile;
    let supported = match algorithm {
        ConvolutionAlgorithm::Auto => true,
        ConvolutionAlgorithm::Wt8x8 => {
            unit_subsampling && kernel_size.height == 3 && kernel_size.width == 3
        }
        ConvolutionAlgorithm::Ft8x8 => unit_subsampling && fits(8),
        ConvolutionAlgorithm::Ft16x16 => unit_subsampling && fits(16),
    };
    check(supported, Status::UnsupportedAlgorithm)
}

struct ConvBuffers<'a> {
    input: ArrayView3<'a, f32>,
    kernels: ArrayView2<'a, f32>,
    bias: ArrayView1<'a, f32>,
}

fn conv_buffers<'a>(
    batch_size: usize,
    geometry: &ConvGeometry,
    output_size: &Size,
    input: &'a [f32],
    kernel: &'a [f32],
    bias: &'a [f32],
    output_len: usize,
) -> Result<ConvBuffers<'a>, Status> {
    let c = geometry.input_channels;
    let m = geometry.output_channels;
    let input_size = &geometry.input_size;
    let patch_len = c * geometry.kernel_size.area();
    check(
        input.len() == batch_size * c * input_size.area(),
        Status::InvalidBufferSize,
    )?;
    check(kernel.len() == m * patch_len, Status::InvalidBufferSize)?;
    check(bias.len() == m, Status::InvalidBufferSize)?;
    check(
        output_len == batch_size * m * output_size.area(),
        Status::InvalidBufferSize,
    )?;
    let input = ArrayView3::from_shape(
        (batch_size * c, input_size.height, input_size.width),
        input,
    )
    .map_err(|_| Status::InvalidBufferSize)?;
    let kernels =
        ArrayView2::from_shape((m, patch_len), kernel).map_err(|_| Status::InvalidBufferSize)?;
    let bias = ArrayView1::from_shape(m, bias).map_err(|_| Status::InvalidBufferSize)?;
    Ok(ConvBuffers {
        input,
        kernels,
        bias,
    })
}

fn conv_plan(geometry: &ConvGeometry, subsampling: Size, output_size: Size) -> Conv2dPlan {
    Conv2dPlan {
        kernel_size: geometry.kernel_size,
        subsampling,
        padding: geometry.input_padding,
        output_size,
    }
}

fn convolution_inference_impl(
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
) -> Result<(), Status> {
    let output_size = check_conv_geometry(1, geometry, &output_subsampling)?;
    check_algorithm(algorithm, &geometry.kernel_size, &output_subsampling)?;
    let buffers = conv_buffers(1, geometry, &output_size, input, kernel, bias, output.len())?;
    let plan = conv_plan(geometry, output_subsampling, output_size);

    let mut scratch = Vec::new();
    let columns = match workspace {
        Some(workspace) => &mut workspace.buffer,
        None => &mut scratch,
    };
    pool.install(|| {
        conv2d_image(
            &buffers.input,
            &buffers.kernels,
            &buffers.bias,
            &plan,
            strategy,
            columns,
            output,
            true,
        )
    })
    .map_err(|_| Status::InvalidBufferSize)
}

fn convolution_output_impl(
    algorithm: ConvolutionAlgorithm,
    batch_size: usize,
    geometry: &ConvGeometry,
    input: &[f32],
    kernel: &[f32],
    bias: &[f32],
    output: &mut [f32],
    pool: &ThreadPool,
) -> Result<(), Status> {
    let subsampling = Size::new(1, 1);
    let output_size = check_conv_geometry(batch_size, geometry, &subsampling)?;
    check_algorithm(algorithm, &geometry.kernel_size, &subsampling)?;
    let buffers = conv_buffers(
        batch_size,
        geometry,
        &output_size,
        input,
        kernel,
        bias,
        output.len(),
    )?;
    let plan = conv_plan(geometry, subsampling, output_size);

    let c = geometry.input_channels;
    let out_image_len = geometry.output_channels * output_size.area();
    pool.install(|| {
        output
            .par_chunks_mut(out_image_len)
            .enumerate()
            .try_for_each(|(n, image_out)| -> Result<(), ShapeError> {
                let image = buffers.input.slice(s![n * c..(n + 1) * c, .., ..]);
                let mut columns = Vec::new();
                conv2d_image(
                    &image,
                    &buffers.kernels,
                    &buffers.bias,
                    &plan,
                    TransformStrategy::BlockBased,
                    &mut columns,
                    image_out,
                    false,
                )
            })
    })
    .map_err(|_| Status::InvalidBufferSize)
}

fn max_pooling_output_impl(
    geometry: &PoolGeometry,
    input: &[f32],
    output: &mut [f32],
    pool: &ThreadPool,
) -> Result<(), Status> {
    check(geometry.batch_size > 0, Status::InvalidBatchSize)?;
    check(geometry.channels > 0, Status::InvalidChannels)?;
    check(!geometry.input_size.is_empty(), Status::InvalidInputSize)?;
    check(!geometry.pooling_size.is_empty(), Status::InvalidPoolingSize)?;
    check(!geometry.pooling_stride.is_empty(), Status::InvalidPoolingStride)?;
    check(
        geometry.pooling_size == Size::new(2, 2),
        Status::UnsupportedPoolingSize,
    )?;
    check(
        geometry.pooling_stride == Size::new(2, 2),
        Status::UnsupportedPoolingStride,
    )?;
    check(
        geometry.input_padding.fits_within(&geometry.pooling_size),
        Status::InvalidInputPadding,
    )?;
    let output_size = pool2d_output_size(
        &geometry.input_size,
        &geometry.pooling_size,
        &geometry.pooling_stride,
        &geometry.input_padding,
    )
    .ok_or(Status::InvalidInputSize)?;

    let planes = geometry.batch_size * geometry.channels;
    let in_plane = geometry.input_size.area();
    let out_plane = output_size.area();
    check(input.len() == planes * in_plane, Status::InvalidBufferSize)?;
    check(output.len() == planes * out_plane, Status::InvalidBufferSize)?;

    pool.install(|| {
        output
            .par_chunks_mut(out_plane)
            .zip(input.par_chunks(in_plane))
            .try_for_each(|(plane_out, plane_in)| -> Result<(), ShapeError> {
                let plane_in = ArrayView2::from_shape(
                    (geometry.input_size.height, geometry.input_size.width),
                    plane_in,
                )?;
                let mut plane_out =
                    ArrayViewMut2::from_shape((output_size.height, output_size.width), plane_out)?;
                max_pool2d_plane(
                    &plane_in,
                    &geometry.pooling_size,
                    &geometry.pooling_stride,
                    &geometry.input_padding,
                    &mut plane_out,
                );
                Ok(())
            })
    })
    .map_err(|_| Status::InvalidBufferSize)
}

impl KernelLibrary for NdArrayKernels {
    fn initialize(&self) -> Status {
        Status::Success
    }

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
    ) -> Status {
        into_status(convolution_inference_impl(
            algorithm,
            strategy,
            geometry,
            output_subsampling,
            input,
            kernel,
            bias,
            output,
            pool,
            workspace,
        ))
    }

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
    ) -> Status {
        into_status(convolution_output_impl(
            algorithm, batch_size, geometry, input, kernel, bias, output, pool,
        ))
    }

    fn max_pooling_output(
        &self,
        geometry: &PoolGeometry,
        input: &[f32],
        output: &mut [f32],
        pool: &ThreadPool,
    ) -> Status {
        into_status(max_pooling_output_impl(geometry, input, output, pool))
    }
}
