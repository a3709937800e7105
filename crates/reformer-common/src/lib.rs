pub mod error;
pub mod value;
pub mod year;

pub use error::*;
pub use value::*;
pub use year::*;
