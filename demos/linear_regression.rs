use rand::Rng;

use scalargrad::{ ops::*, Parameter, Variable, Result, optimize::{ Optimizer, SGD, DescentConfig } };

// Fit log(metabolic rate) = w0 + w1 * log(mass) to noisy samples of Kleiber's law

fn main() -> Result<()> {
  env_logger::init();

  // Generate dataset
  let mut rng = rand::thread_rng();
  let (xs, ys): (Vec<f64>, Vec<f64>) = (0..60)
    .map(|_| {
      let log_mass: f64 = rng.gen_range(-4.0, 8.0);
      let rate = 70.0 * (0.75 * log_mass).exp() * rng.gen_range(0.8, 1.25);
      (log_mass, rate.ln())
    })
    .unzip();
  let x = Variable::vec(&xs);
  let y = Variable::vec(&ys);

  // Mean squared error of a linear model
  let least_squares = |w: &[Parameter<f64>]| {
    let errors: Vec<Variable<f64>> = x.iter()
      .zip(&y)
      .map(|(x, y)| (&*w[0] + &(&*w[1] * x) - y).sqr() )
      .collect();
    mean(&errors)
  };

  // Run gradient descent
  let weights = Parameter::vec(&[10.0, 10.0]);
  let config = DescentConfig { max_iterations: 1000, ..DescentConfig::default() };
  let mut optimizer = Optimizer::with_config(config, SGD);
  let history = optimizer.descend(&weights, least_squares)?;

  for (step, loss) in history.losses.iter().enumerate().step_by(100) {
    println!("Step {step:>4}: loss {loss:.5}");
  }
  let first = history.losses[0];
  let last = history.last_loss().unwrap_or(first);
  println!("Loss fell from {first:.5} to {last:.5}");
  assert!(last < first, "gradient descent diverged");
  let w = scalargrad::values(&weights);
  println!("Learned intercept {:.3} and slope {:.3}", w[0], w[1]);

  // Sample the fitted line
  for xi in (-6..8).map(|x| x as f64 ) {
    println!("log mass {xi:>5.1} -> log rate {:.3}", w[0] + xi * w[1]);
  }

  // Keep the history around for plotting elsewhere
  if let Some(path) = std::env::args().nth(1) {
    history.save(&path)?;
    println!("History saved to {path}");
  }

  Ok(())
}
