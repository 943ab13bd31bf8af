#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod annotate;
pub(crate) mod decimal;
pub mod error;
pub mod rounding;
pub mod runs;
pub mod style;

pub use error::Error;
pub use rounding::{format, Measurement, RoundedDigits, RoundedMeasurement};

pub type Result<T> = ::std::result::Result<T, Error>;
