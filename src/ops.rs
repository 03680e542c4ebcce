use itertools::Itertools;

use crate::{
  error::{ Error, Result },
  scalar::{ Real, lit },
  variable::{ Variable, Parameter },
};


/// Conversion between raw scalars and differentiable nodes.

pub trait BaseOps<I: Real>: Clone {
  fn scalar(item: I) -> Self;
  fn item(&self) -> I;
}


/// Differentiable elementary operations.
///
/// Operations whose input domain is restricted return a [Result].

pub trait RealOps<I: Real>: Sized {
  fn pow(&self, rhs: &Self) -> Self;
  fn sin(&self) -> Self;
  fn exp(&self) -> Self;
  fn log(&self) -> Result<Self>;
  fn reciprocal(&self) -> Result<Self>;
}


/// High-level operations, implemented exclusively on top of
/// elementary operations. As a result, these are all
/// differentiable when called on a [Variable].

pub trait Hops<I>: BaseOps<I> + RealOps<I>
where
  I: Real,
  for<'a> &'a Self: std::ops::Add<I, Output = Self>,
{
  fn powf(&self, exp: I) -> Self {
    self.pow(&Self::scalar(exp))
  }

  fn sqr(&self) -> Self {
    self.powf(lit(2.0))
  }

  fn sqrt(&self) -> Self {
    self.powf(lit(0.5))
  }

  fn cos(&self) -> Self {
    (self + lit::<I>(std::f64::consts::FRAC_PI_2)).sin()
  }
}


/// Operators accepted by [Variable::apply].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Add,
  Sub,
  Mul,
  Div,
  Pow,
}

impl std::fmt::Display for Operator {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let symbol = match self {
      Operator::Add => "+",
      Operator::Sub => "-",
      Operator::Mul => "*",
      Operator::Div => "/",
      Operator::Pow => "**",
    };
    write!(f, "{symbol}")
  }
}


/// Right-hand operand of a dynamically dispatched operation.

#[derive(Debug, Clone)]
pub enum Operand<T: Real> {
  Constant(T),
  Node(Variable<T>),
  Array(Vec<T>),
}

impl<T: Real> Operand<T> {
  pub fn kind(&self) -> &'static str {
    match self {
      Operand::Constant(_) => "constant",
      Operand::Node(_) => "node",
      Operand::Array(_) => "array",
    }
  }
}

impl<T: Real> From<T> for Operand<T> {
  fn from(value: T) -> Self {
    Self::Constant(value)
  }
}

impl<T: Real> From<Variable<T>> for Operand<T> {
  fn from(var: Variable<T>) -> Self {
    Self::Node(var)
  }
}

impl<T: Real> From<&Variable<T>> for Operand<T> {
  fn from(var: &Variable<T>) -> Self {
    Self::Node(var.clone())
  }
}

impl<T: Real> From<&Parameter<T>> for Operand<T> {
  fn from(param: &Parameter<T>) -> Self {
    Self::Node(param.variable().clone())
  }
}

impl<T: Real> From<Vec<T>> for Operand<T> {
  fn from(values: Vec<T>) -> Self {
    Self::Array(values)
  }
}

impl<T: Real> From<&[T]> for Operand<T> {
  fn from(values: &[T]) -> Self {
    Self::Array(values.to_vec())
  }
}


/// Result of a dynamically dispatched operation.

#[derive(Debug, Clone, PartialEq)]
pub enum Output<T: Real> {
  Node(Variable<T>),
  Array(Vec<Variable<T>>),
}

impl<T: Real> Output<T> {
  pub fn node(self) -> Option<Variable<T>> {
    match self {
      Output::Node(var) => Some(var),
      Output::Array(_) => None,
    }
  }

  pub fn array(self) -> Option<Vec<Variable<T>>> {
    match self {
      Output::Array(vars) => Some(vars),
      Output::Node(_) => None,
    }
  }
}


/// Add `node` to every element of `values`, lifting each element into a leaf.

pub fn broadcast_add<T: Real>(node: &Variable<T>, values: &[T]) -> Vec<Variable<T>> {
  values.iter().map(|&value| &Variable::new(value) + node ).collect()
}

/// Sum of all nodes. An empty slice sums to a constant zero.

pub fn sum<T: Real, V: AsRef<Variable<T>>>(vars: &[V]) -> Variable<T> {
  let mut iter = vars.iter().map(|var| var.as_ref() );
  match iter.next() {
    Some(first) => iter.fold(first.clone(), |acc, var| acc + var ),
    None => Variable::new(T::zero()),
  }
}

pub fn dot<T: Real, L, R>(lhs: &[L], rhs: &[R]) -> Result<Variable<T>>
where
  L: AsRef<Variable<T>>,
  R: AsRef<Variable<T>>,
{
  if lhs.len() != rhs.len() {
    return Err(Error::LengthMismatch { lhs: lhs.len(), rhs: rhs.len() })
  }
  let products: Vec<Variable<T>> = lhs.iter()
    .zip_eq(rhs)
    .map(|(l, r)| l.as_ref() * r.as_ref() )
    .collect();
  Ok(sum(&products))
}

pub fn mean<T: Real, V: AsRef<Variable<T>>>(vars: &[V]) -> Result<Variable<T>> {
  let n = Variable::new(lit::<T>(vars.len() as f64));
  sum(vars).try_div(&n)
}
