use std::f64::consts::PI;

use scalargrad::{ ops::*, Variable };

// Compute dy/dx for y = sin(x) by automatic differentiation

fn main() {
  env_logger::init();

  let n = 1000;
  let xs: Vec<f64> = (0..n).map(|i| -2.0 * PI + 4.0 * PI * i as f64 / (n - 1) as f64 ).collect();

  println!("{:>8} {:>10} {:>10} {:>10}", "x", "y", "dy/dx", "cos(x)");
  for x in Variable::vec(&xs).iter().step_by(50) {
    let y = x.sin();
    let dy = y.gradients()[x];
    println!("{:>8.3} {:>10.5} {:>10.5} {:>10.5}", x.value(), y.value(), dy, x.value().cos());
  }
}
