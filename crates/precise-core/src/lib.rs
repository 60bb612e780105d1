pub mod decimal;
pub mod error;
pub mod market;
pub mod number;
pub mod precise;
pub mod precision;

pub use decimal::*;
pub use error::*;
pub use market::*;
pub use number::*;
pub use precise::*;
pub use precision::*;
