pub mod column;
pub mod style;
pub mod value;

pub use column::*;
pub use style::*;
pub use value::*;
