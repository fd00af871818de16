use ndarray::{ArrayView1, ArrayView2, ArrayView3, ArrayViewMut2, LinalgScalar, ShapeError};
use rayon::prelude::*;

use super::common::im2col;
use crate::backends::nnp::{Padding, Size, TransformStrategy};

/// Everything needed to convolve a single CHW image.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Conv2dPlan {
    pub kernel_size: Size,
    pub subsampling: Size,
    pub padding: Padding,
    pub output_size: Size,
}

impl Conv2dPlan {
    fn patch_len(&self, channels: usize) -> usize {
        channels * self.kernel_size.area()
    }
}

/// Multiplies a block of unfolded columns by the filter bank and writes the
/// biased result at `offset` inside every output channel plane.
fn write_tile<A>(
    kernels: &ArrayView2<A>,
    bias: &ArrayView1<A>,
    columns: &ArrayView2<A>,
    output: &mut [A],
    offset: usize,
    parallel: bool,
) where
    A: LinalgScalar + Send + Sync,
{
    let plane = output.len() / kernels.nrows();
    let write = |(m, plane_out): (usize, &mut [A])| {
        let values = kernels.row(m).dot(columns);
        let b = bias[m];
        plane_out[offset..offset + values.len()]
            .iter_mut()
            .zip(values.iter())
            .for_each(|(o, &v)| *o = v + b);
    };
    if parallel {
        output.par_chunks_mut(plane).enumerate().for_each(&write);
    } else {
        output.chunks_mut(plane).enumerate().for_each(&write);
    }
}

/// Convolves one image.
///
/// `kernels` is the filter bank flattened to `(M, C * Kh * Kw)`, `output` the
/// `(M, OH, OW)` result buffer. `columns` is scratch space and only grows.
/// With `parallel` set, output channels are spread over the current rayon pool.
pub(crate) fn conv2d_image<A>(
    input: &ArrayView3<A>,
    kernels: &ArrayView2<A>,
    bias: &ArrayView1<A>,
    plan: &Conv2dPlan,
    strategy: TransformStrategy,
    columns: &mut Vec<A>,
    output: &mut [A],
    parallel: bool,
) -> Result<(), ShapeError>
where
    A: LinalgScalar + Send + Sync,
{
    let (channels, _, _) = input.dim();
    let patch_len = plan.patch_len(channels);
    let out_h = plan.output_size.height;
    let out_w = plan.output_size.width;

    let rows_per_tile = match strategy {
        TransformStrategy::BlockBased => out_h,
        TransformStrategy::TupleBased => 1,
    };
    let tile_len = rows_per_tile * out_w;
    if columns.len() < patch_len * tile_len {
        columns.resize(patch_len * tile_len, A::zero());
    }

    for first_row in (0..out_h).step_by(rows_per_tile) {
        let rows = first_row..(first_row + rows_per_tile).min(out_h);
        let cols_len = rows.len() * out_w;
        let mut tile =
            ArrayViewMut2::from_shape((patch_len, cols_len), &mut columns[..patch_len * cols_len])?;
        im2col(
            input,
            &plan.kernel_size,
            &plan.subsampling,
            &plan.padding,
            out_w,
            rows,
            &mut tile,
        );
        write_tile(
            kernels,
            bias,
            &tile.view(),
            output,
            first_row * out_w,
            parallel,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2, Array3, Array4};

    fn plan(k: usize, s: usize, p: usize, out: usize) -> Conv2dPlan {
        Conv2dPlan {
            kernel_size: Size::new(k, k),
            subsampling: Size::new(s, s),
            padding: Padding::from_tblr(p, p, p, p),
            output_size: Size::new(out, out),
        }
    }

    fn run(
        input: &Array3<f32>,
        kernels: &Array4<f32>,
        bias: &Array1<f32>,
        plan: &Conv2dPlan,
        strategy: TransformStrategy,
    ) -> Vec<f32> {
        let m = kernels.shape()[0];
        let flat = kernels
            .view()
            .into_shape((m, kernels.len() / m))
            .unwrap();
        let mut columns = Vec::new();
        let mut output = vec![0.0; m * plan.output_size.area()];
        conv2d_image(
            &input.view(),
            &flat,
            &bias.view(),
            plan,
            strategy,
            &mut columns,
            &mut output,
            false,
        )
        .unwrap();
        output
    }

    #[test]
    fn test_ones() {
        let input = Array3::<f32>::ones((1, 4, 4));
        let kernels = Array4::<f32>::ones((1, 1, 2, 2));
        let bias = array![0.0f32];
        let output = run(&input, &kernels, &bias, &plan(2, 1, 0, 3), TransformStrategy::BlockBased);
        assert_eq!(output, vec![4.0; 9]);
    }

    #[test]
    fn test_strategies_agree() {
        let input = Array3::from_shape_fn((2, 5, 5), |(c, h, w)| (c * 25 + h * 5 + w) as f32);
        let kernels = Array4::from_shape_fn((3, 2, 3, 3), |(m, c, h, w)| {
            ((m + c + h * w) % 4) as f32 - 1.0
        });
        let bias = array![0.5f32, -1.0, 2.0];
        let plan = plan(3, 2, 1, 3);
        let block = run(&input, &kernels, &bias, &plan, TransformStrategy::BlockBased);
        let tuple = run(&input, &kernels, &bias, &plan, TransformStrategy::TupleBased);
        assert_eq!(block, tuple);
    }

    #[test]
    fn test_columns_are_reused() {
        let input = Array3::<f32>::ones((1, 3, 3));
        let kernels = Array2::<f32>::ones((1, 1));
        let bias = array![1.0f32];
        let mut columns = vec![7.0f32; 64];
        let mut output = vec![0.0; 9];
        conv2d_image(
            &input.view(),
            &kernels.view(),
            &bias.view(),
            &plan(1, 1, 0, 3),
            TransformStrategy::BlockBased,
            &mut columns,
            &mut output,
            false,
        )
        .unwrap();
        assert_eq!(columns.len(), 64);
        assert_eq!(output, vec![2.0; 9]);
    }
}
