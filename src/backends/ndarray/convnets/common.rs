use std::ops::Range;

use ndarray::{ArrayView3, ArrayViewMut2, LinalgScalar};

use crate::backends::nnp::{Padding, Size};

/// Maps an output coordinate plus a window tap back onto the unpadded input
/// axis, `None` when the tap lands in the padding.
#[inline]
pub(super) fn source_index(
    out_idx: usize,
    tap: usize,
    stride: usize,
    pad_head: usize,
    axis_len: usize,
) -> Option<usize> {
    let idx = (out_idx * stride + tap).checked_sub(pad_head)?;
    if idx < axis_len {
        Some(idx)
    } else {
        None
    }
}

/// Unfolds the receptive fields of the output rows in `rows` into `columns`.
///
/// `columns` is `(C * Kh * Kw, rows.len() * out_w)`; row `(c * Kh + kh) * Kw + kw`
/// holds tap `(kh, kw)` of channel `c`, so a MCHW filter bank reshaped to
/// `(M, C * Kh * Kw)` multiplies it directly.
pub(super) fn im2col<A: LinalgScalar>(
    input: &ArrayView3<A>,
    kernel_size: &Size,
    subsampling: &Size,
    padding: &Padding,
    out_w: usize,
    rows: Range<usize>,
    columns: &mut ArrayViewMut2<A>,
) {
    let (channels, in_h, in_w) = input.dim();
    for c in 0..channels {
        for kh in 0..kernel_size.height {
            for kw in 0..kernel_size.width {
                let row = (c * kernel_size.height + kh) * kernel_size.width + kw;
                let mut col = 0;
                for oh in rows.clone() {
                    let ih = source_index(oh, kh, subsampling.height, padding.top, in_h);
                    for ow in 0..out_w {
                        let iw = source_index(ow, kw, subsampling.width, padding.left, in_w);
                        columns[[row, col]] = match (ih, iw) {
                            (Some(ih), Some(iw)) => input[[c, ih, iw]],
                            _ => A::zero(),
                        };
                        col += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3};

    #[test]
    fn test_source_index() {
        assert_eq!(source_index(0, 0, 1, 1, 4), None);
        assert_eq!(source_index(0, 1, 1, 1, 4), Some(0));
        assert_eq!(source_index(3, 1, 1, 0, 4), None);
        assert_eq!(source_index(1, 1, 2, 0, 4), Some(3));
    }

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[test]
    fn test_im2col_with_padding() {
        let input: Array3<f32> = array![[[1., 2.], [3., 4.]]];
        let mut columns = Array2::<f32>::zeros((4, 9));
        im2col(
            &input.view(),
            &Size::new(2, 2),
            &Size::new(1, 1),
            &Padding::from_tblr(1, 1, 1, 1),
            3,
            0..3,
            &mut columns.view_mut(),
        );
        let expected: Array2<f32> = array![
            [0., 0., 0., 0., 1., 2., 0., 3., 4.],
            [0., 0., 0., 1., 2., 0., 3., 4., 0.],
            [0., 1., 2., 0., 3., 4., 0., 0., 0.],
            [1., 2., 0., 3., 4., 0., 0., 0., 0.]
        ];
        assert_eq!(columns, expected);
    }

    #[test]
    fn test_im2col_row_range() {
        let input: Array3<f32> = array![[[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]]];
        let mut columns = Array2::<f32>::zeros((1, 3));
        im2col(
            &input.view(),
            &Size::new(1, 1),
            &Size::new(1, 1),
            &Padding::default(),
            3,
            2..3,
            &mut columns.view_mut(),
        );
        assert_eq!(columns, array![[7., 8., 9.]]);
    }
}
