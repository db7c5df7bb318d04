mod constants;
mod convertible;
mod sort_order;
mod type_utils;
mod value;

pub use constants::*;
pub use convertible::*;
pub use sort_order::*;
pub use type_utils::*;
pub use value::*;
