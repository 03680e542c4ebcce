use rand::Rng;

use crate::{
  scalar::{ Real, lit },
};


// Polar Box-Muller transformation

pub fn randn<T: Real>() -> (T, T) {
  let mut rng = rand::thread_rng();
  loop {
    let u = rng.gen_range(-T::one(), T::one());
    let v = rng.gen_range(-T::one(), T::one());
    let r = u * u + v * v;
    // Try again if outside interval
    if r == T::zero() || r >= T::one() { continue }
    let c = (lit::<T>(-2.0) * r.ln() / r).sqrt();
    return (u * c, v * c)
  }
}


/// Fill a vector with standard normal samples.

pub fn randn_vec<T: Real>(len: usize) -> Vec<T> {
  let mut out = Vec::with_capacity(len + 1);
  while out.len() < len {
    let (a, b) = randn();
    out.push(a);
    out.push(b);
  }
  out.truncate(len);
  out
}
