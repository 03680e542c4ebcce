use std::fs;
use std::path::Path;

use log::{ debug, trace };
use serde::{ Serialize, Deserialize, de::DeserializeOwned };

use crate::{
  error::Result,
  scalar::{ Real, lit },
  variable::{ Variable, Parameter, Gradients, values },
};


/// An optimization strategy to be used with [Optimizer].

pub trait Strategy<R: Real> {
  /// Change to apply to `param`, given its gradient.
  fn update(&mut self, param: &Parameter<R>, grad: R, rate: R, step: usize) -> R;
}


/// Fixed step gradient descent

#[derive(Debug, Clone, Default)]
pub struct SGD;

impl<R: Real> Strategy<R> for SGD {
  fn update(&mut self, _param: &Parameter<R>, grad: R, rate: R, _step: usize) -> R {
    -rate * grad
  }
}


/// Settings for [Optimizer::descend].

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescentConfig<R> {
  pub learning_rate: R,
  pub max_iterations: usize,
}

impl<R: Real> Default for DescentConfig<R> {
  fn default() -> Self {
    Self {
      learning_rate: lit(0.02),
      max_iterations: 200,
    }
  }
}


/// Loss and parameter values recorded during [Optimizer::descend].
///
/// `losses[i]` is the loss evaluated at parameter values `weights[i]`. The first
/// entry precedes any update, the last one follows the final update.
/// Saved histories carry the settings they were produced with.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History<R> {
  pub config: DescentConfig<R>,
  pub losses: Vec<R>,
  pub weights: Vec<Vec<R>>,
}

impl<R: Real> History<R> {
  fn record(&mut self, loss: R, params: &[Parameter<R>]) {
    self.losses.push(loss);
    self.weights.push(values(params));
  }

  pub fn last_loss(&self) -> Option<R> {
    self.losses.last().copied()
  }

  pub fn last_weights(&self) -> Option<&[R]> {
    self.weights.last().map(|weights| weights.as_slice() )
  }
}

impl<R: Real + Serialize + DeserializeOwned> History<R> {
  pub fn load(filename: impl AsRef<Path>) -> Result<Self> {
    let bytes = fs::read(filename)?;
    Ok(postcard::from_bytes(&bytes)?)
  }

  pub fn save(&self, filename: impl AsRef<Path>) -> Result<()> {
    let data: Vec<u8> = postcard::to_allocvec(self)?;
    Ok(fs::write(filename, data)?)
  }
}


/// Generic optimizer that allows for several optimization [strategies](Strategy) to be used.

#[derive(Debug)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  strategy: S,
  pub config: DescentConfig<R>,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(learning_rate: R, strategy: S) -> Self {
    Self::with_config(DescentConfig { learning_rate, ..DescentConfig::default() }, strategy)
  }

  pub fn with_config(config: DescentConfig<R>, strategy: S) -> Self {
    Self { strategy, config, step: 1 }
  }

  /// Number of the next step to be taken, starting at one.

  pub fn step(&self) -> usize {
    self.step
  }

  /// Update every parameter in `params` once, using the gradients of `loss`.

  pub fn minimize(&mut self, loss: &Variable<R>, params: &[Parameter<R>]) -> Gradients<R> {
    // Compute gradients
    let grads = loss.gradients();

    // Optimize individual parameters
    for param in params {
      let change = self.strategy.update(param, grads[param], self.config.learning_rate, self.step);
      trace!("Step {}: parameter #{} {:?} changes by {:?}", self.step, param.id(), param.value(), change);
      param.update(change);
    }

    self.step += 1;
    grads
  }

  /// Repeatedly rebuild the loss from `params` and minimize it,
  /// for the configured number of iterations.

  pub fn descend<F>(&mut self, params: &[Parameter<R>], loss_fn: F) -> Result<History<R>>
  where
    F: Fn(&[Parameter<R>]) -> Result<Variable<R>>
  {
    let mut history = History { config: self.config, losses: vec![], weights: vec![] };
    for _ in 0..self.config.max_iterations {
      let loss = loss_fn(params)?;
      debug!("Step {}: loss {:?}", self.step, loss.value());
      history.record(loss.value(), params);
      self.minimize(&loss, params);
    }
    history.record(loss_fn(params)?.value(), params);
    Ok(history)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;
  use crate::{ Error, ops::{ self, Hops } };

  fn least_squares(xs: &[f64], ys: &[f64], w: &[Parameter<f64>]) -> Result<Variable<f64>> {
    let errors: Vec<Variable<f64>> = xs.iter()
      .zip(ys)
      .map(|(&x, &y)| (&*w[0] + &(&*w[1] * x) - y).sqr() )
      .collect();
    ops::mean(&errors)
  }

  #[test]
  fn sgd_step() {
    let w = Parameter::new(5.0);
    let loss = (&*w - 3.0).sqr();
    let mut optimizer = Optimizer::new(0.25, SGD);
    let grads = optimizer.minimize(&loss, &[w.clone()]);
    assert_eq!(grads[&w], 4.0);
    assert_eq!(w.value(), 4.0);
    assert_eq!(optimizer.step(), 2);
  }

  #[test]
  fn linear_regression() {
    let xs = [-2.0, -1.0, 0.0, 1.0, 2.0];
    let ys: Vec<f64> = xs.iter().map(|x| 1.5 + 0.75 * x ).collect();
    let w = Parameter::vec(&[10.0, 10.0]);
    let config = DescentConfig { learning_rate: 0.1, max_iterations: 300 };
    let mut optimizer = Optimizer::with_config(config, SGD);
    let history = optimizer.descend(&w, |w| least_squares(&xs, &ys, w) ).unwrap();

    assert_eq!(history.losses.len(), 301);
    assert_eq!(history.weights.len(), 301);
    assert_eq!(history.weights[0], vec![10.0, 10.0]);
    assert_eq!(history.config, config);
    for pair in history.losses[..50].windows(2) {
      assert!(pair[1] < pair[0]);
    }
    let weights = history.last_weights().unwrap();
    assert_abs_diff_eq!(weights[0], 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(weights[1], 0.75, epsilon = 1e-6);
    assert_eq!(weights, values(&w).as_slice());
  }

  #[test]
  fn log_log_fit() {
    // Log masses spread over several orders of magnitude, as in the demo
    let xs: Vec<f64> = (0..60).map(|i| -4.0 + 12.0 * i as f64 / 59.0 ).collect();
    let ys: Vec<f64> = xs.iter().map(|x| 70f64.ln() + 0.75 * x ).collect();
    let w = Parameter::vec(&[10.0, 10.0]);
    let config = DescentConfig { max_iterations: 1000, ..DescentConfig::default() };
    let mut optimizer = Optimizer::with_config(config, SGD);
    let history = optimizer.descend(&w, |w| least_squares(&xs, &ys, w) ).unwrap();

    for pair in history.losses[..100].windows(2) {
      assert!(pair[1] < pair[0]);
    }
    assert!(history.last_loss().unwrap() < 1e-10);
    let weights = history.last_weights().unwrap();
    assert_abs_diff_eq!(weights[0], 70f64.ln(), epsilon = 1e-5);
    assert_abs_diff_eq!(weights[1], 0.75, epsilon = 1e-5);
  }

  #[test]
  fn descend_propagates_errors() {
    let w = Parameter::vec(&[1.0]);
    let mut optimizer = Optimizer::with_config(DescentConfig::default(), SGD);
    let result = optimizer.descend(&w, |w| w[0].try_div(&Variable::new(0.0)) );
    assert_eq!(result.unwrap_err(), Error::DivisionByZero);
  }

  #[test]
  fn default_config() {
    let config = DescentConfig::<f32>::default();
    assert_eq!(config.learning_rate, 0.02);
    assert_eq!(config.max_iterations, 200);
  }

  #[test]
  fn save_history() {
    let history = History {
      config: DescentConfig { learning_rate: 0.5, max_iterations: 2 },
      losses: vec![4.0, 1.0, 0.25],
      weights: vec![vec![1.0, 2.0], vec![0.5, 1.5], vec![0.25, 1.25]],
    };
    let path = std::env::temp_dir().join(format!("scalargrad-history-{}.bin", std::process::id()));
    history.save(&path).unwrap();
    let loaded: History<f64> = History::load(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(loaded, history);
    assert!(matches!(History::<f64>::load(&path), Err(Error::Io(_))));
  }
}
