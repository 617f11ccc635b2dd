//! Composable linear operators over opaque fields.
//!
//! A [`LinearOperator`] bundles up to four actions — forward, adjoint,
//! inverse, adjoint-inverse — each filling a destination field from a source
//! field. The algebraic transforms (`adj`, `inv`, composition via `*`,
//! `converted`, `grouped`) return new operators whose actions, vector spaces,
//! guess flags and batching are derived from the operands; operands are never
//! mutated and are shared structurally.
//!
//! Contract violations — invoking an absent action, mismatched batch lengths,
//! converting an operator without concrete spaces — panic immediately rather
//! than degrade.

use std::fmt;
use std::sync::Arc;

use crate::core::traits::{Field, Precision};

pub mod space;
pub use space::VectorSpace;

mod node;
use node::{Leaf, Node};

/// The four action directions of an operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Adjoint,
    Inverse,
    AdjointInverse,
}

impl Direction {
    /// Direction of the same action on the adjoint operator.
    pub fn adj(self) -> Self {
        match self {
            Direction::Forward => Direction::Adjoint,
            Direction::Adjoint => Direction::Forward,
            Direction::Inverse => Direction::AdjointInverse,
            Direction::AdjointInverse => Direction::Inverse,
        }
    }

    /// Direction of the same action on the inverse operator.
    pub fn inv(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
            Direction::Adjoint => Direction::AdjointInverse,
            Direction::AdjointInverse => Direction::Adjoint,
        }
    }
}

/// How an operator's actions consume fields.
#[derive(Clone)]
pub enum Batching {
    /// One field at a time; list calls are looped internally.
    Single,
    /// Equal-length source and destination lists, handed over whole.
    Fixed,
    /// Destination count is a function of the source count.
    Variable(Arc<dyn Fn(usize) -> usize + Send + Sync>),
}

impl Batching {
    /// Number of destination fields produced for `n` source fields.
    pub fn output_len(&self, n: usize) -> usize {
        match self {
            Batching::Single | Batching::Fixed => n,
            Batching::Variable(f) => f(n),
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, Batching::Single)
    }

    /// Batching of a wrapping operator: at least list-capable.
    pub(crate) fn listed(&self) -> Batching {
        match self {
            Batching::Single => Batching::Fixed,
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Batching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Batching::Single => f.write_str("Single"),
            Batching::Fixed => f.write_str("Fixed"),
            Batching::Variable(_) => f.write_str("Variable(..)"),
        }
    }
}

/// A single action callable, in either calling shape.
pub(crate) enum ActionFn<F> {
    Single(Box<dyn Fn(&mut F, &F) + Send + Sync>),
    Batch(Box<dyn Fn(&mut [F], &[F]) + Send + Sync>),
}

impl<F> ActionFn<F> {
    fn is_batch(&self) -> bool {
        matches!(self, ActionFn::Batch(_))
    }
}

/// Bundle of up to four related linear maps plus metadata, composable
/// algebraically. Cheap to clone; structure is immutable and shared.
pub struct LinearOperator<F: Field> {
    node: Arc<Node<F>>,
}

impl<F: Field> Clone for LinearOperator<F> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<F: Field> LinearOperator<F> {
    pub fn builder() -> OperatorBuilder<F> {
        OperatorBuilder::new()
    }

    fn from_node(node: Node<F>) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// Adjoint operator: forward/adjoint and inverse/adjoint-inverse swapped,
    /// spaces and guess flags reversed. Taking the adjoint twice returns a
    /// handle to the original structure.
    pub fn adj(&self) -> Self {
        match &*self.node {
            Node::Adjoint(inner) => Self {
                node: inner.clone(),
            },
            _ => Self::from_node(Node::Adjoint(self.node.clone())),
        }
    }

    /// Inverse operator: forward/inverse and adjoint/adjoint-inverse swapped,
    /// spaces and guess flags reversed. Self-inverse like [`adj`](Self::adj).
    pub fn inv(&self) -> Self {
        match &*self.node {
            Node::Inverse(inner) => Self {
                node: inner.clone(),
            },
            _ => Self::from_node(Node::Inverse(self.node.clone())),
        }
    }

    /// `(A^†)^{-1}`, which equals `(A^{-1})^†`.
    pub fn adj_inv(&self) -> Self {
        self.adj().inv()
    }

    /// Operator that runs the native actions at their declared precision:
    /// inputs are converted in, results converted back out, and the guess is
    /// converted too on guess-accepting sides. Requires concrete spaces.
    pub fn converted(&self, precision: Precision) -> Self {
        let m = self.node.meta();
        assert!(
            !m.domain.is_implicit() && !m.codomain.is_implicit(),
            "precision conversion requires concrete vector spaces on both sides"
        );
        Self::from_node(Node::Converted(self.node.clone(), precision))
    }

    /// Operator that partitions list calls into chunks of at most
    /// `max_group_size` sources, preserving output order and any declared
    /// output-per-input expansion. Bounds the working set of large batches.
    pub fn grouped(&self, max_group_size: usize) -> Self {
        assert!(max_group_size >= 1, "group size must be at least 1");
        Self::from_node(Node::Grouped(self.node.clone(), max_group_size))
    }

    pub fn domain(&self) -> VectorSpace<F> {
        self.node.meta().domain
    }

    pub fn codomain(&self) -> VectorSpace<F> {
        self.node.meta().codomain
    }

    /// (forward side, inverse side) guess acceptance.
    pub fn accept_guess(&self) -> (bool, bool) {
        self.node.meta().accept_guess
    }

    pub fn batching(&self) -> Batching {
        self.node.meta().batching
    }

    /// Whether the action in `dir` is defined.
    pub fn has(&self, dir: Direction) -> bool {
        self.node.has(dir)
    }

    /// Forward apply: fill `dst` with `A·src`.
    pub fn apply(&self, dst: &mut F, src: &F) {
        self.apply_dir(Direction::Forward, dst, src);
    }

    /// Single-field apply of the action in `dir`.
    pub fn apply_dir(&self, dir: Direction, dst: &mut F, src: &F) {
        let m = self.node.meta_for(dir);
        assert_eq!(
            m.batching.output_len(1),
            1,
            "operator with expanding output requires the batch interface"
        );
        self.node
            .call_into(dir, std::slice::from_mut(dst), std::slice::from_ref(src));
    }

    /// Forward apply over a batch of fields.
    pub fn apply_batch(&self, dst: &mut [F], src: &[F]) {
        self.node.call_into(Direction::Forward, dst, src);
    }

    /// Batch apply of the action in `dir`.
    pub fn apply_batch_dir(&self, dir: Direction, dst: &mut [F], src: &[F]) {
        self.node.call_into(dir, dst, src);
    }

    /// Forward apply with an auto-allocated destination.
    pub fn call(&self, src: &F) -> F {
        let mut out = self.node.call_alloc(Direction::Forward, std::slice::from_ref(src));
        assert_eq!(
            out.len(),
            1,
            "operator with expanding output requires the batch interface"
        );
        out.pop().expect("one destination")
    }

    /// Forward apply over a batch with auto-allocated destinations.
    pub fn call_batch(&self, src: &[F]) -> Vec<F> {
        self.node.call_alloc(Direction::Forward, src)
    }
}

impl<F: Field> std::ops::Mul for &LinearOperator<F> {
    type Output = LinearOperator<F>;

    /// Composition `a * b`: forward applies `b` then `a`; adjoint and inverse
    /// compose in reverse order; guess flags are `(a.forward, b.inverse)`.
    fn mul(self, rhs: Self) -> LinearOperator<F> {
        LinearOperator::from_node(Node::Compose(self.node.clone(), rhs.node.clone()))
    }
}

impl<F: Field> std::ops::Mul for LinearOperator<F> {
    type Output = LinearOperator<F>;

    fn mul(self, rhs: Self) -> LinearOperator<F> {
        &self * &rhs
    }
}

/// Builder for leaf operators; the sole construction entry point.
///
/// At most one calling shape may be used per operator: either all supplied
/// actions take single fields, or all take batches (`*_batch`, optionally
/// with [`output_len`](Self::output_len) for expanding operators).
pub struct OperatorBuilder<F: Field> {
    forward: Option<ActionFn<F>>,
    adjoint: Option<ActionFn<F>>,
    inverse: Option<ActionFn<F>>,
    adjoint_inverse: Option<ActionFn<F>>,
    domain: VectorSpace<F>,
    codomain: VectorSpace<F>,
    accept_guess: (bool, bool),
    batching: Batching,
}

impl<F: Field> OperatorBuilder<F> {
    pub fn new() -> Self {
        Self {
            forward: None,
            adjoint: None,
            inverse: None,
            adjoint_inverse: None,
            domain: VectorSpace::Implicit,
            codomain: VectorSpace::Implicit,
            accept_guess: (false, false),
            batching: Batching::Single,
        }
    }

    pub fn forward(mut self, f: impl Fn(&mut F, &F) + Send + Sync + 'static) -> Self {
        self.forward = Some(ActionFn::Single(Box::new(f)));
        self
    }

    pub fn adjoint(mut self, f: impl Fn(&mut F, &F) + Send + Sync + 'static) -> Self {
        self.adjoint = Some(ActionFn::Single(Box::new(f)));
        self
    }

    pub fn inverse(mut self, f: impl Fn(&mut F, &F) + Send + Sync + 'static) -> Self {
        self.inverse = Some(ActionFn::Single(Box::new(f)));
        self
    }

    pub fn adjoint_inverse(mut self, f: impl Fn(&mut F, &F) + Send + Sync + 'static) -> Self {
        self.adjoint_inverse = Some(ActionFn::Single(Box::new(f)));
        self
    }

    pub fn forward_batch(mut self, f: impl Fn(&mut [F], &[F]) + Send + Sync + 'static) -> Self {
        self.forward = Some(ActionFn::Batch(Box::new(f)));
        self.batching = self.batching.listed();
        self
    }

    pub fn adjoint_batch(mut self, f: impl Fn(&mut [F], &[F]) + Send + Sync + 'static) -> Self {
        self.adjoint = Some(ActionFn::Batch(Box::new(f)));
        self.batching = self.batching.listed();
        self
    }

    pub fn inverse_batch(mut self, f: impl Fn(&mut [F], &[F]) + Send + Sync + 'static) -> Self {
        self.inverse = Some(ActionFn::Batch(Box::new(f)));
        self.batching = self.batching.listed();
        self
    }

    pub fn adjoint_inverse_batch(
        mut self,
        f: impl Fn(&mut [F], &[F]) + Send + Sync + 'static,
    ) -> Self {
        self.adjoint_inverse = Some(ActionFn::Batch(Box::new(f)));
        self.batching = self.batching.listed();
        self
    }

    /// Declare an expanding batch operator: `f(n)` destination fields are
    /// produced for `n` source fields.
    pub fn output_len(mut self, f: impl Fn(usize) -> usize + Send + Sync + 'static) -> Self {
        self.batching = Batching::Variable(Arc::new(f));
        self
    }

    /// Concrete domain (source side) space.
    pub fn domain(mut self, space: F::Space) -> Self {
        self.domain = VectorSpace::Concrete(space);
        self
    }

    /// Concrete codomain (destination side) space.
    pub fn codomain(mut self, space: F::Space) -> Self {
        self.codomain = VectorSpace::Concrete(space);
        self
    }

    /// One concrete space for both sides.
    pub fn space(self, space: F::Space) -> Self {
        let s = space.clone();
        self.domain(space).codomain(s)
    }

    /// Whether a pre-existing destination is treated as an initial guess on
    /// the forward and on the inverse side.
    pub fn accept_guess(mut self, forward: bool, inverse: bool) -> Self {
        self.accept_guess = (forward, inverse);
        self
    }

    pub fn build(self) -> LinearOperator<F> {
        let want_batch = self.batching.is_list();
        for action in [
            self.forward.as_ref(),
            self.adjoint.as_ref(),
            self.inverse.as_ref(),
            self.adjoint_inverse.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            assert_eq!(
                action.is_batch(),
                want_batch,
                "operator actions mix single-field and batch calling shapes"
            );
        }
        LinearOperator::from_node(Node::Leaf(Leaf {
            forward: self.forward,
            adjoint: self.adjoint,
            inverse: self.inverse,
            adjoint_inverse: self.adjoint_inverse,
            domain: self.domain,
            codomain: self.codomain,
            accept_guess: self.accept_guess,
            batching: self.batching,
        }))
    }
}

impl<F: Field> Default for OperatorBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}
