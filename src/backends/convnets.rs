use crate::backends::nnp::{Padding, Size};

/// Output length of a strided window sliding over an explicitly padded axis.
///
/// Returns `None` when the window does not fit into the padded axis.
pub(crate) fn get_conv2d_result_axis_len(
    axis_len: usize,
    kernel_size: usize,
    stride: usize,
    pad_head: usize,
    pad_tail: usize,
) -> Option<usize> {
    let padded = axis_len + pad_head + pad_tail;
    if kernel_size == 0 || stride == 0 || padded < kernel_size {
        return None;
    }
    Some((padded - kernel_size) / stride + 1)
}

/// Same as `get_conv2d_result_axis_len`, but a trailing partial window still
/// produces an output element.
pub(crate) fn get_pool2d_result_axis_len(
    axis_len: usize,
    pool_size: usize,
    stride: usize,
    pad_head: usize,
    pad_tail: usize,
) -> Option<usize> {
    let padded = axis_len + pad_head + pad_tail;
    if pool_size == 0 || stride == 0 || padded < pool_size {
        return None;
    }
    Some((padded - pool_size + stride - 1) / stride + 1)
}

pub(crate) fn conv2d_output_size(
    input_size: &Size,
    kernel_size: &Size,
    subsampling: &Size,
    padding: &Padding,
) -> Option<Size> {
    let height = get_conv2d_result_axis_len(
        input_size.height,
        kernel_size.height,
        subsampling.height,
        padding.top,
        padding.bottom,
    )?;
    let width = get_conv2d_result_axis_len(
        input_size.width,
        kernel_size.width,
        subsampling.width,
        padding.left,
        padding.right,
    )?;
    Some(Size::new(height, width))
}

pub(crate) fn pool2d_output_size(
    input_size: &Size,
    pooling_size: &Size,
    pooling_stride: &Size,
    padding: &Padding,
) -> Option<Size> {
    let height = get_pool2d_result_axis_len(
        input_size.height,
        pooling_size.height,
        pooling_stride.height,
        padding.top,
        padding.bottom,
    )?;
    let width = get_pool2d_result_axis_len(
        input_size.width,
        pooling_size.width,
        pooling_stride.width,
        padding.left,
        padding.right,
    )?;
    Some(Size::new(height, width))
}
