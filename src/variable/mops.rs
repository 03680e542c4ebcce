use crate::{
  error::{ Error, Result },
  scalar::Real,
  variable::{ Variable, BinaryOp, UnaryOp, Op },
  ops::{ BaseOps, RealOps, Hops, Operator, Operand, Output, broadcast_add },
};


impl<T: Real> BaseOps<T> for Variable<T> {
  fn scalar(item: T) -> Self {
    Self::new(item)
  }

  fn item(&self) -> T {
    self.value()
  }
}

impl<T: Real> RealOps<T> for Variable<T> {
  /// Raise to the current value of `rhs`. The exponent itself is
  /// treated as a constant and receives no gradient.
  fn pow(&self, rhs: &Self) -> Self {
    self.record(Pow { exponent: rhs.value() })
  }

  fn sin(&self) -> Self {
    self.record(Sin)
  }

  fn exp(&self) -> Self {
    self.record(Exp)
  }

  fn log(&self) -> Result<Self> {
    self.unary_op(Log)
  }

  fn reciprocal(&self) -> Result<Self> {
    self.unary_op(Reciprocal)
  }
}

impl<T: Real> Hops<T> for Variable<T> {}

impl<T: Real> Variable<T> {
  /// Division as multiplication with the reciprocal of `rhs`.

  pub fn try_div(&self, rhs: &Self) -> Result<Self> {
    Ok(self * &rhs.reciprocal()?)
  }

  /// Apply `operator` to a node, constant or array operand.
  ///
  /// Arrays are only supported by addition, which broadcasts this
  /// node across every element.

  pub fn apply(&self, operator: Operator, rhs: impl Into<Operand<T>>) -> Result<Output<T>> {
    let rhs = match rhs.into() {
      Operand::Node(var) => var,
      Operand::Constant(value) => Self::new(value),
      Operand::Array(values) if operator == Operator::Add => {
        return Ok(Output::Array(broadcast_add(self, &values)))
      },
      operand => return Err(Error::TypeMismatch {
        operand: operand.kind().to_string(),
        operator: operator.to_string(),
      }),
    };
    let out = match operator {
      Operator::Add => self + &rhs,
      Operator::Sub => self - &rhs,
      Operator::Mul => self * &rhs,
      Operator::Div => self.try_div(&rhs)?,
      Operator::Pow => self.pow(&rhs),
    };
    Ok(Output::Node(out))
  }
}


fn add_nodes<T: Real>(lhs: &Variable<T>, rhs: &Variable<T>) -> Variable<T> {
  lhs.binary_op(Add, rhs)
}

fn sub_nodes<T: Real>(lhs: &Variable<T>, rhs: &Variable<T>) -> Variable<T> {
  lhs.binary_op(Add, &-rhs)
}

fn mul_nodes<T: Real>(lhs: &Variable<T>, rhs: &Variable<T>) -> Variable<T> {
  lhs.binary_op(Mul, rhs)
}

// Operator traits cannot report errors
fn div_nodes<T: Real>(lhs: &Variable<T>, rhs: &Variable<T>) -> Variable<T> {
  lhs.try_div(rhs).unwrap_or_else(|err| panic!("{err}") )
}


impl<T: Real> std::ops::Neg for &Variable<T> {
  type Output = Variable<T>;

  fn neg(self) -> Self::Output {
    self.record(Neg)
  }
}

impl<T: Real> std::ops::Neg for Variable<T> {
  type Output = Variable<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  (@lhs $op:ident, $meth:ident, $symbol:tt, $float:ty) => {
    impl std::ops::$op<&Variable<$float>> for $float { // T + &var
      type Output = Variable<$float>;

      fn $meth(self, rhs: &Variable<$float>) -> Variable<$float> {
        &Variable::new(self) $symbol rhs
      }
    }

    impl std::ops::$op<Variable<$float>> for $float { // T + var
      type Output = Variable<$float>;

      fn $meth(self, rhs: Variable<$float>) -> Variable<$float> {
        &Variable::new(self) $symbol &rhs
      }
    }
  };

  ($op:ident, $meth:ident, $symbol:tt, $build:ident) => {
    impl<T: Real> std::ops::$op for &Variable<T> { // &var + &other
      type Output = Variable<T>;

      fn $meth(self, rhs: Self) -> Variable<T> {
        $build(self, rhs)
      }
    }

    impl<T: Real> std::ops::$op for Variable<T> { // var + other
      type Output = Variable<T>;

      fn $meth(self, rhs: Self) -> Variable<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$op<Variable<T>> for &Variable<T> { // &var + other
      type Output = Variable<T>;

      fn $meth(self, rhs: Variable<T>) -> Variable<T> {
        self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$op<&Variable<T>> for Variable<T> { // var + &other
      type Output = Variable<T>;

      fn $meth(self, rhs: &Variable<T>) -> Variable<T> {
        &self $symbol rhs
      }
    }

    impl<T: Real> std::ops::$op<T> for &Variable<T> { // &var + T
      type Output = Variable<T>;

      fn $meth(self, rhs: T) -> Variable<T> {
        self $symbol &Variable::new(rhs)
      }
    }

    impl<T: Real> std::ops::$op<T> for Variable<T> { // var + T
      type Output = Variable<T>;

      fn $meth(self, rhs: T) -> Variable<T> {
        &self $symbol &Variable::new(rhs)
      }
    }

    add_operator!(@lhs $op, $meth, $symbol, f32);
    add_operator!(@lhs $op, $meth, $symbol, f64);
  };
}

add_operator!(Add, add, +, add_nodes);
add_operator!(Sub, sub, -, sub_nodes);
add_operator!(Mul, mul, *, mul_nodes);
add_operator!(Div, div, /, div_nodes);


#[derive(Debug, Clone, Copy)]
pub struct Add;

impl<T: Real> BinaryOp<T> for Add {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs + rhs
  }

  fn derive(&self, _lhs: T, _rhs: T, _out: T) -> (T, T) {
    (T::one(), T::one())
  }

  fn as_enum(&self) -> Op { Op::Add }
}


#[derive(Debug, Clone, Copy)]
pub struct Mul;

impl<T: Real> BinaryOp<T> for Mul {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs * rhs
  }

  fn derive(&self, lhs: T, rhs: T, _out: T) -> (T, T) {
    (rhs, lhs)
  }

  fn as_enum(&self) -> Op { Op::Mul }
}


#[derive(Debug, Clone, Copy)]
pub struct Neg;

impl<T: Real> UnaryOp<T> for Neg {
  fn run(&self, lhs: T) -> T {
    -lhs
  }

  fn derive(&self, _lhs: T, _out: T) -> T {
    -T::one()
  }

  fn as_enum(&self) -> Op { Op::Neg }
}


#[derive(Debug, Clone, Copy)]
pub struct Reciprocal;

impl<T: Real> UnaryOp<T> for Reciprocal {
  fn check(&self, lhs: T) -> Result<()> {
    if lhs == T::zero() { return Err(Error::DivisionByZero) }
    Ok(())
  }

  fn run(&self, lhs: T) -> T {
    T::one() / lhs
  }

  fn derive(&self, lhs: T, _out: T) -> T {
    -T::one() / (lhs * lhs)
  }

  fn as_enum(&self) -> Op { Op::Reciprocal }
}


#[derive(Debug, Clone, Copy)]
pub struct Pow<T> {
  pub exponent: T,
}

impl<T: Real> UnaryOp<T> for Pow<T> {
  fn run(&self, lhs: T) -> T {
    lhs.powf(self.exponent)
  }

  fn derive(&self, lhs: T, _out: T) -> T {
    self.exponent * lhs.powf(self.exponent - T::one())
  }

  fn as_enum(&self) -> Op { Op::Pow }
}


#[derive(Debug, Clone, Copy)]
pub struct Sin;

impl<T: Real> UnaryOp<T> for Sin {
  fn run(&self, lhs: T) -> T {
    lhs.sin()
  }

  fn derive(&self, lhs: T, _out: T) -> T {
    lhs.cos()
  }

  fn as_enum(&self) -> Op { Op::Sin }
}


#[derive(Debug, Clone, Copy)]
pub struct Log;

impl<T: Real> UnaryOp<T> for Log {
  fn check(&self, lhs: T) -> Result<()> {
    if lhs <= T::zero() {
      return Err(Error::DomainError { operation: "log", value: lhs.to_f64().unwrap_or(f64::NAN) })
    }
    Ok(())
  }

  fn run(&self, lhs: T) -> T {
    lhs.ln()
  }

  fn derive(&self, lhs: T, _out: T) -> T {
    T::one() / lhs
  }

  fn as_enum(&self) -> Op { Op::Log }
}


#[derive(Debug, Clone, Copy)]
pub struct Exp;

impl<T: Real> UnaryOp<T> for Exp {
  fn run(&self, lhs: T) -> T {
    lhs.exp()
  }

  fn derive(&self, _lhs: T, out: T) -> T {
    out
  }

  fn as_enum(&self) -> Op { Op::Exp }
}


#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn addition() {
    let a = Variable::new(2.0);
    let b = Variable::new(5.0);
    let c = &a + &b;
    assert_eq!(c.value(), 7.0);
    let g = c.gradients();
    assert_eq!(g[&a], 1.0);
    assert_eq!(g[&b], 1.0);
  }

  #[test]
  fn multiplication() {
    let a = Variable::new(2.0);
    let b = Variable::new(5.0);
    let g = (&a * &b).gradients();
    assert_eq!(g[&a], 5.0);
    assert_eq!(g[&b], 2.0);
  }

  #[test]
  fn subtraction() {
    let a = Variable::new(2.0f64);
    let b = Variable::new(5.0);
    let c = &a - &b;
    assert_eq!(c.value(), -3.0);
    assert_eq!(c.gradients()[&b], -1.0);
    assert_eq!((10.0 - &a).value(), 8.0);
    assert_eq!((&a - 10.0).value(), -8.0);
  }

  #[test]
  fn division() {
    let a = Variable::new(3.0);
    let b = Variable::new(4.0f64);
    let c = &a / &b;
    assert_eq!(c.value(), 0.75);
    let g = c.gradients();
    assert_eq!(g[&a], 0.25);
    assert_eq!(g[&b], -3.0 / 16.0);
    assert_eq!((1.0 / &b).value(), 0.25);
  }

  #[test]
  fn division_by_zero() {
    let a = Variable::new(1.0);
    let zero = Variable::new(0.0);
    assert_eq!(a.try_div(&zero), Err(Error::DivisionByZero));
    assert_eq!(zero.reciprocal(), Err(Error::DivisionByZero));
  }

  #[test]
  #[should_panic(expected = "Division by zero")]
  fn division_operator_by_zero() {
    let _ = Variable::new(1.0) / 0.0;
  }

  #[test]
  fn negation() {
    let a = Variable::new(2.0);
    let b = -&a;
    assert_eq!(b.value(), -2.0);
    assert_eq!(b.gradients()[&a], -1.0);
  }

  #[test]
  fn power() {
    let x = Variable::new(3.0);
    let y = x.powf(2.0);
    assert_eq!(y.value(), 9.0);
    assert_eq!(y.gradients()[&x], 6.0);
  }

  #[test]
  fn power_exponent_is_constant() {
    let x = Variable::new(2.0);
    let p = Variable::new(3.0);
    let y = x.pow(&p);
    assert_eq!(y.value(), 8.0);
    let g = y.gradients();
    assert_eq!(g[&x], 12.0);
    assert!(!g.contains(&p));
  }

  #[test]
  fn sine() {
    let x = Variable::new(0.0);
    let y = x.sin();
    assert_eq!(y.value(), 0.0);
    assert_eq!(y.gradients()[&x], 1.0);
  }

  #[test]
  fn logarithm() {
    let x = Variable::new(2.0);
    let y = x.log().unwrap();
    assert_relative_eq!(y.value(), std::f64::consts::LN_2);
    assert_eq!(y.gradients()[&x], 0.5);
    assert_eq!(
      Variable::new(-1.0).log(),
      Err(Error::DomainError { operation: "log", value: -1.0 }),
    );
    assert!(Variable::new(0.0).log().is_err());
  }

  #[test]
  fn exponential() {
    let x = Variable::new(1.0);
    let y = x.exp();
    assert_relative_eq!(y.value(), std::f64::consts::E);
    assert_relative_eq!(y.gradients()[&x], std::f64::consts::E);
  }

  #[test]
  fn apply_operands() {
    let x = Variable::new(2.0);
    let y = Variable::new(3.0);
    assert_eq!(x.apply(Operator::Mul, &y).unwrap().node().unwrap().value(), 6.0);
    assert_eq!(x.apply(Operator::Sub, 0.5).unwrap().node().unwrap().value(), 1.5);
    assert_eq!(x.apply(Operator::Pow, 3.0).unwrap().node().unwrap().value(), 8.0);
    assert_eq!(x.apply(Operator::Div, 0.0), Err(Error::DivisionByZero));

    let sums = x.apply(Operator::Add, vec![1.0, 2.0]).unwrap().array().unwrap();
    assert_eq!(crate::values(&sums), vec![3.0, 4.0]);
  }

  #[test]
  fn apply_rejects_arrays() {
    let x = Variable::new(2.0);
    let err = x.apply(Operator::Mul, vec![1.0, 2.0]).unwrap_err();
    assert_eq!(err, Error::TypeMismatch { operand: "array".to_string(), operator: "*".to_string() });
    assert_eq!(err.to_string(), "Unsupported operand type array for '*'");
  }

  #[test]
  fn constants_on_either_side() {
    let x = Variable::new(2.0f32);
    assert_eq!((&x + 1.0).value(), 3.0);
    assert_eq!((1.0 + &x).value(), 3.0);
    assert_eq!((3.0 * x.clone()).value(), 6.0);
    assert_eq!((x / 4.0).value(), 0.5);
  }
}
