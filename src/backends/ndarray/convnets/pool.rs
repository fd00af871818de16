use ndarray::{ArrayView2, ArrayViewMut2};
use num_traits::Float;

use super::common::source_index;
use crate::backends::nnp::{Padding, Size};

/// Max-pools a single `(H, W)` plane into `output`.
///
/// Window taps falling into the padding are skipped rather than read as zero,
/// so padded borders never win over real values.
pub(crate) fn max_pool2d_plane<A: Float>(
    input: &ArrayView2<A>,
    pooling_size: &Size,
    pooling_stride: &Size,
    padding: &Padding,
    output: &mut ArrayViewMut2<A>,
) {
    let (in_h, in_w) = input.dim();
    for ((oh, ow), out) in output.indexed_iter_mut() {
        let mut max = A::neg_infinity();
        for ph in 0..pooling_size.height {
            let ih = match source_index(oh, ph, pooling_stride.height, padding.top, in_h) {
                Some(ih) => ih,
                None => continue,
            };
            for pw in 0..pooling_size.width {
                if let Some(iw) = source_index(ow, pw, pooling_stride.width, padding.left, in_w) {
                    max = max.max(input[[ih, iw]]);
                }
            }
        }
        *out = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[test]
    fn test_max_pool_2x2() {
        let input: Array2<f32> = array![
            [ 1.,  2.,  3.,  4.],
            [ 5.,  6.,  7.,  8.],
            [ 9., 10., 11., 12.],
            [13., 14., 15., 16.]
        ];
        let mut output = Array2::<f32>::zeros((2, 2));
        max_pool2d_plane(
            &input.view(),
            &Size::new(2, 2),
            &Size::new(2, 2),
            &Padding::default(),
            &mut output.view_mut(),
        );
        assert_eq!(output, array![[6., 8.], [14., 16.]]);
    }

    #[test]
    fn test_max_pool_ignores_padding() {
        let input: Array2<f32> = array![[-3., -1.], [-4., -2.]];
        let mut output = Array2::<f32>::zeros((2, 2));
        max_pool2d_plane(
            &input.view(),
            &Size::new(2, 2),
            &Size::new(2, 2),
            &Padding::from_tblr(1, 1, 1, 1),
            &mut output.view_mut(),
        );
        assert_eq!(output, array![[-3., -1.], [-4., -2.]]);
    }
}
