pub mod env;
pub mod error;
pub mod logging;
pub mod primitives;
pub mod test_utils;
