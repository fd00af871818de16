use std::convert::TryFrom;

use crate::backends::convnets::get_conv2d_result_axis_len;
use crate::backends::nnp::{Padding, Size};
use crate::common::errors::OpError;
use crate::common::types::{HError, HResult};
use crate::ops::def::OperatorDef;
use crate::tensor::{ShapeVec, Tensor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageOrder {
    Nchw,
    Nhwc,
}

impl StorageOrder {
    const NCHW_STR: &'static str = "NCHW";
    const NHWC_STR: &'static str = "NHWC";
}

impl TryFrom<&str> for StorageOrder {
    type Error = HError;

    fn try_from(value: &str) -> HResult<StorageOrder> {
        match value {
            Self::NCHW_STR => Ok(StorageOrder::Nchw),
            Self::NHWC_STR => Ok(StorageOrder::Nhwc),
            s => Err(OpError::invalid_argument("order", format!("unknown storage order `{}`", s)).into()),
        }
    }
}

/// Window geometry shared by the convolution and pooling operators.
///
/// Padding is stored top/bottom/left/right; `padding()` converts it to the
/// kernel library layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvPoolBase {
    pub order: StorageOrder,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_t: usize,
    pub pad_b: usize,
    pub pad_l: usize,
    pub pad_r: usize,
}

/// Reads an (h, w) pair given either as `<list>: [h, w]`, `<single>` or
/// `<single>_h` + `<single>_w`.
fn pair_arg(
    def: &OperatorDef,
    single: &str,
    list: &str,
    default: Option<usize>,
) -> HResult<(usize, usize)> {
    let h_name = format!("{}_h", single);
    let w_name = format!("{}_w", single);
    let has_hw = def.has_arg(&h_name) || def.has_arg(&w_name);

    let given = [def.has_arg(list), def.has_arg(single), has_hw];
    if given.iter().filter(|&&g| g).count() > 1 {
        return Err(OpError::invalid_argument(
            single,
            format!("only one of `{}`, `{}` or `{}`/`{}` may be set", list, single, h_name, w_name),
        )
        .into());
    }

    if def.has_arg(list) {
        let values: Vec<usize> = def.get_repeated_arg(list)?;
        return match values.as_slice() {
            [h, w] => Ok((*h, *w)),
            _ => Err(OpError::invalid_argument(
                list,
                format!("expected 2 values, got {}", values.len()),
            )
            .into()),
        };
    }
    if def.has_arg(single) {
        let value = def.get_single_arg(single, 0usize)?;
        return Ok((value, value));
    }
    if has_hw {
        if !(def.has_arg(&h_name) && def.has_arg(&w_name)) {
            return Err(OpError::invalid_argument(
                single,
                format!("`{}` and `{}` must be set together", h_name, w_name),
            )
            .into());
        }
        return Ok((
            def.get_single_arg(&h_name, 0usize)?,
            def.get_single_arg(&w_name, 0usize)?,
        ));
    }
    default
        .map(|d| (d, d))
        .ok_or_else(|| OpError::invalid_argument(single, "missing").into())
}

/// Reads (top, bottom, left, right) from `pads: [t, l, b, r]`, `pad` or the
/// individual `pad_t`/`pad_l`/`pad_b`/`pad_r` arguments.
fn pads_arg(def: &OperatorDef) -> HResult<(usize, usize, usize, usize)> {
    let sides = ["pad_t", "pad_l", "pad_b", "pad_r"];
    let has_sides = sides.iter().any(|s| def.has_arg(s));
    let given = [def.has_arg("pads"), def.has_arg("pad"), has_sides];
    if given.iter().filter(|&&g| g).count() > 1 {
        return Err(OpError::invalid_argument(
            "pad",
            "only one of `pads`, `pad` or `pad_t`/`pad_l`/`pad_b`/`pad_r` may be set",
        )
        .into());
    }

    if def.has_arg("pads") {
        let values: Vec<usize> = def.get_repeated_arg("pads")?;
        return match values.as_slice() {
            [t, l, b, r] => Ok((*t, *b, *l, *r)),
            _ => Err(OpError::invalid_argument(
                "pads",
                format!("expected 4 values, got {}", values.len()),
            )
            .into()),
        };
    }
    if def.has_arg("pad") {
        let pad = def.get_single_arg("pad", 0usize)?;
        return Ok((pad, pad, pad, pad));
    }
    Ok((
        def.get_single_arg("pad_t", 0usize)?,
        def.get_single_arg("pad_b", 0usize)?,
        def.get_single_arg("pad_l", 0usize)?,
        def.get_single_arg("pad_r", 0usize)?,
    ))
}

impl ConvPoolBase {
    pub fn from_def(def: &OperatorDef) -> HResult<ConvPoolBase> {
        let order_str: String = def.get_single_arg("order", String::from(StorageOrder::NCHW_STR))?;
        let order = StorageOrder::try_from(order_str.as_str())?;
        let (kernel_h, kernel_w) = pair_arg(def, "kernel", "kernels", None)?;
        let (stride_h, stride_w) = pair_arg(def, "stride", "strides", Some(1))?;
        let (pad_t, pad_b, pad_l, pad_r) = pads_arg(def)?;

        if kernel_h == 0 || kernel_w == 0 {
            return Err(OpError::invalid_argument("kernel", "must be positive").into());
        }
        if stride_h == 0 || stride_w == 0 {
            return Err(OpError::invalid_argument("stride", "must be positive").into());
        }

        Ok(ConvPoolBase {
            order,
            kernel_h,
            kernel_w,
            stride_h,
            stride_w,
            pad_t,
            pad_b,
            pad_l,
            pad_r,
        })
    }

    pub fn kernel(&self) -> Size {
        Size::new(self.kernel_h, self.kernel_w)
    }

    pub fn stride(&self) -> Size {
        Size::new(self.stride_h, self.stride_w)
    }

    /// Padding in the kernel library's top/right/bottom/left layout.
    pub fn padding(&self) -> Padding {
        Padding::from_tblr(self.pad_t, self.pad_b, self.pad_l, self.pad_r)
    }

    fn spatial_axes(&self) -> (usize, usize) {
        match self.order {
            StorageOrder::Nchw => (2, 3),
            StorageOrder::Nhwc => (1, 2),
        }
    }

    /// Shape of the output of a window op over the rank 4 `input`.
    pub fn output_shape(&self, input: &Tensor, output_channels: usize) -> HResult<ShapeVec> {
        enforce!(
            input.ndim() == 4,
            "Expected a rank 4 input, got shape {:?}",
            input.shape()
        );
        let (h_axis, w_axis) = self.spatial_axes();
        let (in_h, in_w) = (input.dim(h_axis), input.dim(w_axis));
        let out_h = get_conv2d_result_axis_len(in_h, self.kernel_h, self.stride_h, self.pad_t, self.pad_b);
        let out_w = get_conv2d_result_axis_len(in_w, self.kernel_w, self.stride_w, self.pad_l, self.pad_r);
        match (out_h, out_w) {
            (Some(out_h), Some(out_w)) => Ok(match self.order {
                StorageOrder::Nchw => vec![input.dim(0), output_channels, out_h, out_w],
                StorageOrder::Nhwc => vec![input.dim(0), out_h, out_w, output_channels],
            }),
            _ => Err(OpError::Enforce(format!(
                "Input size {}x{} is too small for a {}x{} window with padding (t: {}, b: {}, l: {}, r: {})",
                in_h, in_w, self.kernel_h, self.kernel_w, self.pad_t, self.pad_b, self.pad_l, self.pad_r
            ))
            .into()),
        }
    }

    /// Resizes `output` to the window op output shape.
    pub fn set_output_size(
        &self,
        input: &Tensor,
        output: &mut Tensor,
        output_channels: usize,
    ) -> HResult<()> {
        let shape = self.output_shape(input, output_channels)?;
        output.resize(&shape);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(def: OperatorDef) -> HResult<ConvPoolBase> {
        ConvPoolBase::from_def(&def)
    }

    fn conv() -> OperatorDef {
        OperatorDef::new("Conv", "NNPACK")
    }

    #[test]
    fn test_square_defaults() {
        let b = base(conv().with_arg("kernel", 3)).unwrap();
        assert_eq!(b.order, StorageOrder::Nchw);
        assert_eq!(b.kernel(), Size::new(3, 3));
        assert_eq!(b.stride(), Size::new(1, 1));
        assert_eq!(b.padding(), Padding::default());
    }

    #[test]
    fn test_separate_axes() {
        let b = base(
            conv()
                .with_arg("kernel_h", 3)
                .with_arg("kernel_w", 1)
                .with_arg("stride_h", 2)
                .with_arg("stride_w", 1)
                .with_arg("pad_t", 1)
                .with_arg("pad_r", 2),
        )
        .unwrap();
        assert_eq!(b.kernel(), Size::new(3, 1));
        assert_eq!(b.stride(), Size::new(2, 1));
        assert_eq!((b.pad_t, b.pad_b, b.pad_l, b.pad_r), (1, 0, 0, 2));
    }

    #[test]
    fn test_list_args() {
        let b = base(
            conv()
                .with_arg("kernels", vec![2, 4])
                .with_arg("strides", vec![1, 2])
                .with_arg("pads", vec![1, 2, 3, 4]),
        )
        .unwrap();
        assert_eq!(b.kernel(), Size::new(2, 4));
        assert_eq!(b.stride(), Size::new(1, 2));
        assert_eq!((b.pad_t, b.pad_b, b.pad_l, b.pad_r), (1, 3, 2, 4));
    }

    #[test]
    fn test_padding_is_reordered_for_the_kernel_library() {
        let b = base(
            conv()
                .with_arg("kernel", 5)
                .with_arg("pad_t", 1)
                .with_arg("pad_b", 2)
                .with_arg("pad_l", 3)
                .with_arg("pad_r", 4),
        )
        .unwrap();
        assert_eq!(
            b.padding(),
            Padding {
                top: 1,
                right: 4,
                bottom: 2,
                left: 3
            }
        );
    }

    #[test]
    fn test_invalid_args() {
        assert!(base(conv()).is_err());
        assert!(base(conv().with_arg("kernel", 0)).is_err());
        assert!(base(conv().with_arg("kernel", 3).with_arg("stride", 0)).is_err());
        assert!(base(conv().with_arg("kernel", 3).with_arg("kernel_h", 3)).is_err());
        assert!(base(conv().with_arg("kernel_h", 3)).is_err());
        assert!(base(conv().with_arg("kernels", vec![3])).is_err());
        assert!(base(conv().with_arg("kernel", 3).with_arg("pads", vec![1, 1])).is_err());
        assert!(base(conv().with_arg("kernel", 3).with_arg("pad", 1).with_arg("pad_t", 1)).is_err());
        assert!(base(conv().with_arg("kernel", 3).with_arg("order", "CHWN")).is_err());
    }

    #[test]
    fn test_nhwc_order() {
        let b = base(conv().with_arg("kernel", 3).with_arg("order", "NHWC")).unwrap();
        assert_eq!(b.order, StorageOrder::Nhwc);
        let input = Tensor::zeros(&[2, 5, 6, 3]);
        assert_eq!(b.output_shape(&input, 8).unwrap(), vec![2, 3, 4, 8]);
    }

    #[test]
    fn test_output_shape() {
        let b = base(conv().with_arg("kernel", 3).with_arg("stride", 2).with_arg("pad", 1)).unwrap();
        let input = Tensor::zeros(&[1, 3, 7, 8]);
        assert_eq!(b.output_shape(&input, 16).unwrap(), vec![1, 16, 4, 4]);

        let mut output = Tensor::new();
        b.set_output_size(&input, &mut output, 16).unwrap();
        assert_eq!(output.shape(), &[1, 16, 4, 4]);
        assert_eq!(output.len(), 64);
    }

    #[test]
    fn test_output_shape_too_small() {
        let b = base(conv().with_arg("kernel", 5)).unwrap();
        let input = Tensor::zeros(&[1, 1, 4, 4]);
        let err = b.output_shape(&input, 1).unwrap_err();
        assert!(err.downcast_ref::<OpError>().is_some());
        assert!(b.output_shape(&Tensor::zeros(&[4, 4]), 1).is_err());
    }
}
