use std::rc::Rc;
use std::cell::Cell;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::fmt::Debug;

use itertools::Itertools;

mod mops;
mod backward;

pub use backward::Gradients;

use crate::{
  internal::*,
  error::Result,
  scalar::{ Real, lit },
};


pub fn make_id() -> usize {
  static LAST_ID: AtomicUsize = AtomicUsize::new(0);
  LAST_ID.fetch_add(1, Ordering::Relaxed)
}


/// Unary elementary operation that can also compute its local derivative.

pub trait UnaryOp<T: Real>: Debug {
  /// Reject inputs outside the operation's domain.
  fn check(&self, _lhs: T) -> Result<()> { Ok(()) }
  fn run(&self, lhs: T) -> T;
  /// Derivative of the result with respect to `lhs`, given the already computed result.
  fn derive(&self, lhs: T, out: T) -> T;
  fn as_enum(&self) -> Op;
}


/// Binary elementary operation that can also compute its local derivatives.

pub trait BinaryOp<T: Real>: Debug {
  fn run(&self, lhs: T, rhs: T) -> T;
  fn derive(&self, lhs: T, rhs: T, out: T) -> (T, T);
  fn as_enum(&self) -> Op;
}


/// Kind of elementary operation a node was created by.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
  Add,
  Neg,
  Mul,
  Reciprocal,
  Pow,
  Sin,
  Log,
  Exp,
}

impl std::fmt::Display for Op {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let name = match self {
      Op::Add => "+",
      Op::Neg => "neg",
      Op::Mul => "*",
      Op::Reciprocal => "recip",
      Op::Pow => "pow",
      Op::Sin => "sin",
      Op::Log => "log",
      Op::Exp => "exp",
    };
    write!(f, "{name}")
  }
}


/// Node in a computation graph, containing a value
/// and its local derivatives with respect to the nodes it was computed from.

struct Node<T: Real> {
  id: usize,
  value: Cell<T>,
  op: Option<Op>,
  previous: Vec<(Rc<Self>, T)>,
  trainable: bool,
}

impl<T: Real> PartialEq for Node<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.id == rhs.id
  }
}

// Unlink long chains iteratively instead of through nested drops
impl<T: Real> Drop for Node<T> {
  fn drop(&mut self) {
    let mut stack: Vec<Rc<Self>> = self.previous.drain(..).map(|(prev, _)| prev ).collect();
    while let Some(node) = stack.pop() {
      if let Ok(mut node) = Rc::try_unwrap(node) {
        stack.extend(node.previous.drain(..).map(|(prev, _)| prev ));
      }
    }
  }
}


/// Variables record the elementary operations used to create them and allow
/// for computing their gradient with respect to every node involved.
///
/// Values and local derivatives are computed eagerly, as soon as an operation
/// is applied. Cloning a Variable yields another handle to the same node, so
/// identity is preserved across clones.

#[derive(Clone)]
pub struct Variable<T: Real> {
  node: Rc<Node<T>>,
}

impl<T: Real> PartialEq for Variable<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.node == rhs.node
  }
}

impl<T: Real> From<T> for Variable<T> {
  fn from(value: T) -> Self {
    Self::new(value)
  }
}

impl<T: Real> AsRef<Variable<T>> for Variable<T> {
  fn as_ref(&self) -> &Variable<T> {
    self
  }
}

impl<T: Real> Variable<T> {
  /// Lift a constant into a leaf node.

  pub fn new(value: T) -> Self {
    Self::leaf(value, false)
  }

  /// Lift every element of a slice into its own leaf node.

  pub fn vec(values: &[T]) -> Vec<Self> {
    values.iter().map(|&value| Self::new(value) ).collect()
  }

  fn leaf(value: T, trainable: bool) -> Self {
    Self {
      node: Rc::new(Node {
        id: make_id(),
        value: Cell::new(value),
        op: None,
        previous: vec![],
        trainable,
      }),
    }
  }

  fn operation(op: Op, value: T, previous: Vec<(Rc<Node<T>>, T)>) -> Self {
    Self {
      node: Rc::new(Node {
        id: make_id(),
        value: Cell::new(value),
        op: Some(op),
        previous,
        trainable: false,
      }),
    }
  }

  /// Unique identity of this node. Equal values do not imply equal ids.

  pub fn id(&self) -> usize {
    self.node.id
  }

  pub fn value(&self) -> T {
    self.node.value.get()
  }

  pub fn op(&self) -> Option<Op> {
    self.node.op
  }

  pub fn is_leaf(&self) -> bool {
    self.node.previous.is_empty()
  }

  pub fn is_trainable(&self) -> bool {
    self.node.trainable
  }

  /// Immediate inputs of this node, paired with the local derivative
  /// of this node's value with respect to each of them.

  pub fn inputs(&self) -> Vec<(Self, T)> {
    self.node.previous
      .iter()
      .map(|(prev, grad)| (Self { node: prev.clone() }, *grad) )
      .collect()
  }

  /// Apply a unary operation, failing if the input lies outside its domain.

  pub fn unary_op(&self, op: impl UnaryOp<T>) -> Result<Self> {
    op.check(self.value())?;
    Ok(self.record(op))
  }

  // Callers guarantee that `op` accepts every input
  fn record(&self, op: impl UnaryOp<T>) -> Self {
    let lhs = self.value();
    let value = op.run(lhs);
    let grad = op.derive(lhs, value);
    Self::operation(op.as_enum(), value, vec![(self.node.clone(), grad)])
  }

  pub fn binary_op(&self, op: impl BinaryOp<T>, rhs: &Self) -> Self {
    let (lhs_value, rhs_value) = (self.value(), rhs.value());
    let value = op.run(lhs_value, rhs_value);
    let (grad_l, grad_r) = op.derive(lhs_value, rhs_value, value);
    Self::operation(
      op.as_enum(),
      value,
      vec![(self.node.clone(), grad_l), (rhs.node.clone(), grad_r)],
    )
  }

  /// List all trainable parameters in this Variable's graph.

  pub fn parameters(&self) -> Vec<Parameter<T>> {
    self.history()
      .into_iter()
      .filter(|node| node.trainable )
      .map(|node| Parameter { variable: Self { node } } )
      .collect()
  }

  /// Number of distinct nodes, provenance edges and parameters in this Variable's graph.

  pub fn statistics(&self) -> (usize, usize, usize) {
    let history = self.history();
    let num_nodes = history.len();
    let num_edges = history.iter().map(|node| node.previous.len() ).sum();
    let num_params = history.iter().filter(|node| node.trainable ).count();
    (num_nodes, num_edges, num_params)
  }

  /// Compute a function's gradient with respect to randomly generated
  /// inputs numerically and compare it to the automatically derived
  /// solution.
  ///
  /// Returns the mean absolute difference between both gradients.

  pub fn check_gradients<F>(num_inputs: usize, generator: F) -> T
  where
    F: Fn(&[Self]) -> Self
  {
    if num_inputs == 0 { return T::zero() }
    let eps = T::epsilon().cbrt();
    let two = lit::<T>(2.0);
    let params = Parameter::vec(&randn_vec(num_inputs));
    let inputs: Vec<Self> = params.iter().map(|param| param.variable().clone() ).collect();
    // Compute gradient using auto diff
    let grads = generator(&inputs).gradients();
    // Compute gradient numerically by perturbing one input at a time
    let mut diff = T::zero();
    for param in &params {
      let x = param.value();
      param.set(x + eps);
      let next = generator(&inputs).value();
      param.set(x - eps);
      let prev = generator(&inputs).value();
      param.set(x);
      let numeric = (next - prev) / (two * eps);
      diff += (grads[param] - numeric).abs();
    }
    diff / lit(num_inputs as f64)
  }
}

impl<T: Real> Debug for Variable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("Variable")
      .field("id", &self.node.id)
      .field("value", &self.value())
      .field("op", &self.node.op)
      .field("inputs", &self.node.previous.iter().map(|(prev, _)| prev.id ).collect::<Vec<_>>())
      .finish()
  }
}

impl<T: Real> std::fmt::Display for Variable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self.node.op {
      Some(op) => {
        let inputs = self.node.previous.iter().map(|(prev, _)| format!("#{}", prev.id) ).join(", ");
        write!(f, "Computed {:?} <- {op}({inputs})", self.value())
      },
      None => {
        let title = if self.node.trainable { "Parameter" } else { "Constant" };
        write!(f, "{title} {:?}", self.value())
      },
    }
  }
}


/// Extract the values of a slice of nodes.

pub fn values<T: Real, V: AsRef<Variable<T>>>(vars: &[V]) -> Vec<T> {
  vars.iter().map(|var| var.as_ref().value() ).collect()
}


/// Leaf node whose value may be overwritten between forward passes.
///
/// Parameters dereference to their underlying [Variable], so they can be
/// used wherever a node is expected. Graphs built from a parameter keep
/// referencing it, but only see a new value once they get rebuilt.

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<T: Real> {
  variable: Variable<T>,
}

impl<T: Real> Parameter<T> {
  pub fn new(value: T) -> Self {
    Self { variable: Variable::leaf(value, true) }
  }

  pub fn vec(values: &[T]) -> Vec<Self> {
    values.iter().map(|&value| Self::new(value) ).collect()
  }

  /// Parameters initialized from a standard normal distribution.

  pub fn randn(len: usize) -> Vec<Self> {
    Self::vec(&randn_vec(len))
  }

  pub fn variable(&self) -> &Variable<T> {
    &self.variable
  }

  pub fn set(&self, value: T) {
    self.variable.node.value.set(value);
  }

  /// Shift this parameter's value by `change`.

  pub fn update(&self, change: T) {
    self.set(self.value() + change);
  }
}

impl<T: Real> std::ops::Deref for Parameter<T> {
  type Target = Variable<T>;

  fn deref(&self) -> &Self::Target {
    &self.variable
  }
}

impl<T: Real> AsRef<Variable<T>> for Parameter<T> {
  fn as_ref(&self) -> &Variable<T> {
    &self.variable
  }
}

impl<T: Real> std::fmt::Display for Parameter<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    std::fmt::Display::fmt(&self.variable, f)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;
  use crate::ops::RealOps;

  #[test]
  fn identity() {
    let a = Variable::new(2.0);
    let b = Variable::new(2.0);
    assert_ne!(a, b);
    assert_ne!(a.id(), b.id());
    assert_eq!(a, a.clone());
  }

  #[test]
  fn leaves() {
    let xs = Variable::vec(&[1.0, 2.0, 3.0]);
    assert!(xs.iter().all(|x| x.is_leaf() && !x.is_trainable() ));
    assert_eq!(values(&xs), vec![1.0, 2.0, 3.0]);
    let w = Parameter::new(0.5);
    assert!(w.is_leaf() && w.is_trainable());
  }

  #[test]
  fn local_gradients() {
    let a = Variable::new(3.0);
    let b = Variable::new(4.0);
    let c = &a * &b;
    assert_eq!(c.value(), 12.0);
    assert_eq!(c.op(), Some(Op::Mul));
    assert_eq!(c.inputs(), vec![(a.clone(), 4.0), (b.clone(), 3.0)]);
  }

  #[test]
  fn parameter_update() {
    let w = Parameter::new(1.0);
    let x = Variable::new(2.0);
    let y = &*w * &x;
    w.update(0.5);
    assert_eq!(w.value(), 1.5);
    // Existing graphs keep their recorded values
    assert_eq!(y.value(), 2.0);
    assert_eq!(y.inputs()[1].1, 1.0);
    let y = &*w * &x;
    assert_eq!(y.value(), 3.0);
  }

  #[test]
  fn parameters() {
    let w = Parameter::vec(&[1.0, 2.0]);
    let x = Variable::new(3.0);
    let y = (&*w[0] + &(&*w[1] * &x)) * &*w[0];
    let params = y.parameters();
    assert_eq!(params.len(), 2);
    assert!(params.contains(&w[0]) && params.contains(&w[1]));
    assert_eq!(y.statistics(), (6, 6, 2));
  }

  #[test]
  fn display() {
    let w = Parameter::new(2.0);
    let c = Variable::new(1.0);
    assert_eq!(w.to_string(), "Parameter 2.0");
    assert_eq!(c.to_string(), "Constant 1.0");
    let y = &*w + &c;
    assert_eq!(y.to_string(), format!("Computed 3.0 <- +(#{}, #{})", w.id(), c.id()));
  }

  #[test]
  fn check_gradients() {
    let diff = Variable::<f64>::check_gradients(3, |x| {
      ((&x[0] * &x[1]).sin() + (&x[2] * 0.5).exp()) * &x[0]
    });
    assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-6);
  }

  #[test]
  fn drop_deep_chain() {
    let x = Variable::new(1.0);
    let mut y = x.clone();
    for _ in 0..200_000 {
      y = -&y;
    }
    assert_eq!(y.value(), 1.0);
    drop(y);
    assert!(x.is_leaf());
  }
}
