//! Intersection primitives used by picking

pub mod ray;

pub use ray::{Classification, Ray, Sign};
