use std::rc::Rc;
use std::collections::{ HashMap, HashSet };

use log::{ debug, trace };

use crate::{
  error::Error,
  scalar::Real,
  variable::{ Variable, Parameter, Node },
};


/// Total derivatives of an output with respect to the nodes of its graph.
///
/// Keyed by node identity. Nodes that are not part of the graph have a
/// gradient of zero, as does the output itself.

#[derive(Debug, Clone, PartialEq)]
pub struct Gradients<T: Real> {
  map: HashMap<usize, T>,
  zero: T,
}

impl<T: Real> Gradients<T> {
  fn new(map: HashMap<usize, T>) -> Self {
    Self { map, zero: T::zero() }
  }

  pub fn get(&self, var: &Variable<T>) -> T {
    self[var]
  }

  pub fn contains(&self, var: &Variable<T>) -> bool {
    self.map.contains_key(&var.id())
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  /// Pairs of node id and gradient, in no particular order.

  pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
    self.map.iter().map(|(&id, &grad)| (id, grad) )
  }
}

impl<T: Real> std::ops::Index<&Variable<T>> for Gradients<T> {
  type Output = T;

  fn index(&self, var: &Variable<T>) -> &T {
    self.map.get(&var.id()).unwrap_or(&self.zero)
  }
}

impl<T: Real> std::ops::Index<&Parameter<T>> for Gradients<T> {
  type Output = T;

  fn index(&self, param: &Parameter<T>) -> &T {
    &self[param.variable()]
  }
}


impl<T: Real> Variable<T> {
  /// Compute the gradient of this Variable with respect to every node in its graph.
  ///
  /// Nodes are visited once each, in reverse topological order, so the cost
  /// is linear in the number of edges regardless of how much of the graph is shared.

  pub fn gradients(&self) -> Gradients<T> {
    let history = self.history();
    debug!("Backward pass over {} nodes", history.len());
    let mut adjoints: HashMap<usize, T> = HashMap::with_capacity(history.len());
    adjoints.insert(self.node.id, T::one());
    for node in history.iter().rev() {
      let adjoint = adjoints.get(&node.id).copied().unwrap_or_else(T::zero);
      for (prev, local) in &node.previous {
        *adjoints.entry(prev.id).or_insert_with(T::zero) += adjoint * *local;
      }
    }
    adjoints.remove(&self.node.id);
    Gradients::new(adjoints)
  }

  /// Compute gradients by walking every path from this Variable down to the leaves,
  /// multiplying local derivatives along the way and summing where paths meet.
  ///
  /// Produces the same result as [gradients](Self::gradients), but shared subgraphs
  /// get walked once per path leading to them. The cost grows with the number of
  /// paths, which is exponential in depth for repeatedly shared graphs.

  pub fn path_gradients(&self) -> Gradients<T> {
    let mut gradients: HashMap<usize, T> = HashMap::new();
    let mut stack: Vec<(Rc<Node<T>>, T)> = self.node.previous
      .iter()
      .rev()
      .map(|(prev, local)| (prev.clone(), *local) )
      .collect();
    let mut visits = 0usize;
    while let Some((node, path)) = stack.pop() {
      visits += 1;
      *gradients.entry(node.id).or_insert_with(T::zero) += path;
      stack.extend(node.previous
        .iter()
        .rev()
        .map(|(prev, local)| (prev.clone(), path * *local) ));
    }
    trace!("Walked {visits} paths");
    Gradients::new(gradients)
  }

  // Depth first post-order of all nodes reachable from this one,
  // so every node comes after the nodes it was computed from
  pub(super) fn history(&self) -> Vec<Rc<Node<T>>> {
    let mut history = vec![];
    let mut done: HashSet<usize> = HashSet::new();
    let mut open: HashSet<usize> = HashSet::from([self.node.id]);
    let mut stack: Vec<(Rc<Node<T>>, usize)> = vec![(self.node.clone(), 0)];
    loop {
      let Some((node, next)) = stack.last_mut() else { break };
      let prev = node.previous.get(*next).map(|(prev, _)| prev.clone() );
      *next += 1;
      match prev {
        Some(prev) => {
          if done.contains(&prev.id) { continue }
          if !open.insert(prev.id) {
            panic!("{}", Error::StructuralViolation { node: prev.id })
          }
          stack.push((prev, 0));
        },
        None => if let Some((node, _)) = stack.pop() {
          open.remove(&node.id);
          done.insert(node.id);
          history.push(node);
        },
      }
    }
    history
  }
}
