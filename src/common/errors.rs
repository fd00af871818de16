use crate::backends::nnp::Status;

/// Failures raised by the NNPACK operators.
///
/// The variants follow the lifetime of an operator: `UnsupportedFeature` and
/// `InvalidArgument` can only come out of construction, `Enforce` and
/// `Kernel` out of a run (or the first pool initialization).
#[derive(Debug, Fail)]
pub enum OpError {
    #[fail(display = "Unsupported feature: {}", _0)]
    UnsupportedFeature(String),

    #[fail(display = "Enforce failed: {}", _0)]
    Enforce(String),

    #[fail(
        display = "Enforce failed: kernel call `{}` returned status {:?}",
        call, status
    )]
    Kernel { call: &'static str, status: Status },

    #[fail(display = "Invalid argument `{}`: {}", name, reason)]
    InvalidArgument { name: String, reason: String },
}

impl OpError {
    pub(crate) fn invalid_argument<N: Into<String>, R: Into<String>>(name: N, reason: R) -> OpError {
        OpError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

macro_rules! enforce {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::common::errors::OpError::Enforce(format!($($arg)+)).into());
        }
    };
}

macro_rules! needs_feature {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(
                $crate::common::errors::OpError::UnsupportedFeature(format!($($arg)+)).into(),
            );
        }
    };
}

/// Turns a kernel library status into a result.
pub(crate) fn check_status(call: &'static str, status: Status) -> Result<(), OpError> {
    match status {
        Status::Success => Ok(()),
        status => Err(OpError::Kernel { call, status }),
    }
}
