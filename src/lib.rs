//! Reverse-mode automatic differentiation for scalar expressions.
//! Tiny. Few dependencies. Works on stable Rust.
//!
//! # Features
//!
//! - **Eager graphs** — Every elementary operation immediately computes its value
//! along with the local derivatives with respect to its inputs, recording them
//! in a graph of shared [Variable] nodes.
//!
//! - **Linear-time gradients** — [Variable::gradients] visits every node once,
//! in reverse topological order, no matter how much of the graph is shared.
//! Graphs of any depth can be differentiated and dropped without recursion.
//!
//! - **Explicit parameters** — Leaves that a training loop may update in place
//! are [Parameter]s, distinct from constants and intermediate results.
//!
//! - **Gradient descent** — Includes a fixed step optimizer that records its
//! loss history.
//!
//! # Examples
//!
//! Differentiating an expression:
//! ```
//! use scalargrad::{ ops::*, Variable };
//!
//! let x = Variable::new(3.0);
//! let y = x.powf(2.0) + x.sin();
//! let grads = y.gradients();
//! assert_eq!(grads[&x], 6.0 + 3.0f64.cos());
//! ```
//!
//! Minimizing a function:
//! ```
//! use scalargrad::{ ops::*, Parameter, optimize::{ Optimizer, SGD } };
//!
//! let w = Parameter::new(10.0f64);
//! let mut optimizer = Optimizer::new(0.1, SGD);
//! for _ in 0..100 {
//!   let loss = (&*w - 2.0).sqr();
//!   optimizer.minimize(&loss, &[w.clone()]);
//! }
//! assert!((w.value() - 2.0).abs() < 1e-6);
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for more example code.

mod internal;
mod error;
mod variable;

pub mod ops;
pub mod scalar;
pub mod optimize;

pub use error::{ Error, Result };
pub use variable::{ Variable, Parameter, Gradients, Op, UnaryOp, BinaryOp, values };
