mod common;
mod conv;
mod pool;

pub(crate) use conv::{conv2d_image, Conv2dPlan};
pub(crate) use pool::max_pool2d_plane;
