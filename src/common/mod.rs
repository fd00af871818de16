#[macro_use]
pub(crate) mod errors;
pub(crate) mod traits;
pub(crate) mod types;
