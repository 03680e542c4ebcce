use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps };


/// All types that may be stored in a [Variable](crate::Variable).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + std::fmt::Debug {}
impl<T: PartialEq + Clone + Copy + std::fmt::Debug> Inner for T {}


/// Continuous numeric types that can be differentiated.
///
/// Implemented automatically for [f32] and [f64].

pub trait Real: Inner + Float + NumAssignOps + SampleUniform + std::iter::Sum {}
impl<T: Inner + Float + NumAssignOps + SampleUniform + std::iter::Sum> Real for T {}


/// Lossy conversion from a literal, for constants used inside generic code.

#[inline]
pub(crate) fn lit<T: Real>(value: f64) -> T {
  T::from(value).unwrap_or_else(T::nan)
}
