//! Operator node tree and its evaluation.
//!
//! Algebraic transforms never rebuild action closures; they wrap the operand
//! in a new node and the walk below routes each of the four action directions
//! to the right child with the right direction. Metadata (spaces, guess
//! flags, batching) is derived per node so transformed operators always stay
//! consistent with their operands.

use std::sync::Arc;

use crate::core::traits::{Field, FieldSpace, Precision};
use crate::operator::space::VectorSpace;
use crate::operator::{ActionFn, Batching, Direction};

/// Leaf operator: up to four caller-supplied actions plus metadata.
pub(crate) struct Leaf<F: Field> {
    pub forward: Option<ActionFn<F>>,
    pub adjoint: Option<ActionFn<F>>,
    pub inverse: Option<ActionFn<F>>,
    pub adjoint_inverse: Option<ActionFn<F>>,
    pub domain: VectorSpace<F>,
    pub codomain: VectorSpace<F>,
    /// (forward side, inverse side): treat a pre-existing destination as an
    /// initial guess instead of requiring it to be overwritten from scratch.
    pub accept_guess: (bool, bool),
    pub batching: Batching,
}

pub(crate) enum Node<F: Field> {
    Leaf(Leaf<F>),
    /// `Compose(a, b)` is the product `a * b`: forward applies `b` then `a`.
    Compose(Arc<Node<F>>, Arc<Node<F>>),
    Adjoint(Arc<Node<F>>),
    Inverse(Arc<Node<F>>),
    Converted(Arc<Node<F>>, Precision),
    Grouped(Arc<Node<F>>, usize),
}

/// Effective metadata of a node, before any direction swap.
pub(crate) struct Meta<F: Field> {
    pub domain: VectorSpace<F>,
    pub codomain: VectorSpace<F>,
    pub accept_guess: (bool, bool),
    pub batching: Batching,
}

impl<F: Field> Meta<F> {
    fn swapped(self) -> Self {
        Meta {
            domain: self.codomain,
            codomain: self.domain,
            accept_guess: (self.accept_guess.1, self.accept_guess.0),
            batching: self.batching,
        }
    }
}

impl<F: Field> Leaf<F> {
    fn slot(&self, dir: Direction) -> Option<&ActionFn<F>> {
        match dir {
            Direction::Forward => self.forward.as_ref(),
            Direction::Adjoint => self.adjoint.as_ref(),
            Direction::Inverse => self.inverse.as_ref(),
            Direction::AdjointInverse => self.adjoint_inverse.as_ref(),
        }
    }

    fn apply(&self, dir: Direction, dst: &mut [F], src: &[F]) {
        let action = match self.slot(dir) {
            Some(a) => a,
            None => panic!("linear operator has no {dir:?} action"),
        };
        match action {
            // non-list actions are looped behind the uniform interface
            ActionFn::Single(f) => {
                assert_eq!(
                    dst.len(),
                    src.len(),
                    "single-field action requires matching source and destination counts"
                );
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    f(d, s);
                }
            }
            ActionFn::Batch(f) => f(dst, src),
        }
    }
}

impl<F: Field> Node<F> {
    pub(crate) fn meta(&self) -> Meta<F> {
        match self {
            Node::Leaf(l) => Meta {
                domain: l.domain.clone(),
                codomain: l.codomain.clone(),
                accept_guess: l.accept_guess,
                batching: l.batching.clone(),
            },
            Node::Compose(a, b) => {
                let ma = a.meta();
                let mb = b.meta();
                Meta {
                    domain: mb.domain,
                    codomain: ma.codomain,
                    accept_guess: (ma.accept_guess.0, mb.accept_guess.1),
                    batching: ma.batching.listed(),
                }
            }
            Node::Adjoint(n) | Node::Inverse(n) => n.meta().swapped(),
            Node::Converted(n, p) => {
                let m = n.meta();
                Meta {
                    domain: m.domain.converted(*p),
                    codomain: m.codomain.converted(*p),
                    accept_guess: m.accept_guess,
                    batching: m.batching.listed(),
                }
            }
            Node::Grouped(n, _) => {
                let m = n.meta();
                Meta {
                    batching: m.batching.listed(),
                    ..m
                }
            }
        }
    }

    /// Metadata as seen by a caller of the given action direction: the
    /// adjoint and inverse directions see domain/codomain and the guess pair
    /// reversed, their composition sees them twice-reversed.
    pub(crate) fn meta_for(&self, dir: Direction) -> Meta<F> {
        let m = self.meta();
        match dir {
            Direction::Forward | Direction::AdjointInverse => m,
            Direction::Adjoint | Direction::Inverse => m.swapped(),
        }
    }

    /// Whether the action in `dir` is defined. Absence propagates: a
    /// composite only has the actions both factors have.
    pub(crate) fn has(&self, dir: Direction) -> bool {
        match self {
            Node::Leaf(l) => l.slot(dir).is_some(),
            Node::Compose(a, b) => a.has(dir) && b.has(dir),
            Node::Adjoint(n) => n.has(dir.adj()),
            Node::Inverse(n) => n.has(dir.inv()),
            Node::Converted(n, _) | Node::Grouped(n, _) => n.has(dir),
        }
    }

    /// Apply the action in `dir` into caller-provided destinations, rerouting
    /// through the consuming space's distribution capability when the sources
    /// live on a different partition.
    pub(crate) fn call_into(&self, dir: Direction, dst: &mut [F], src: &[F]) {
        assert!(self.has(dir), "linear operator has no {dir:?} action");
        let m = self.meta_for(dir);
        assert_eq!(
            dst.len(),
            m.batching.output_len(src.len()),
            "destination count does not match the operator's output count"
        );
        if src.is_empty() {
            return;
        }
        let reroute = match &m.domain {
            VectorSpace::Concrete(s) => !s.matches(&src[0]),
            VectorSpace::Implicit => false,
        };
        if reroute {
            let VectorSpace::Concrete(space) = &m.domain else {
                unreachable!()
            };
            space.distribute(&mut |d, s| self.eval(dir, d, s), dst, src, m.accept_guess.0);
        } else {
            self.eval(dir, dst, src);
        }
    }

    /// Apply the action in `dir`, allocating the destinations. Fresh
    /// destinations are zeroed, so guess-accepting actions see a zero guess.
    pub(crate) fn call_alloc(&self, dir: Direction, src: &[F]) -> Vec<F> {
        if src.is_empty() {
            return Vec::new();
        }
        let m = self.meta_for(dir);
        let n = m.batching.output_len(src.len());
        // when the sources live on a foreign partition the outputs mirror it
        let out_space = match &m.domain {
            VectorSpace::Concrete(s) if !s.matches(&src[0]) => VectorSpace::Concrete(src[0].space()),
            _ => m.codomain.clone(),
        };
        let mut dst: Vec<F> = (0..n).map(|_| out_space.alloc_like(&src[0])).collect();
        self.call_into(dir, &mut dst, src);
        dst
    }

    fn eval(&self, dir: Direction, dst: &mut [F], src: &[F]) {
        match self {
            Node::Leaf(l) => l.apply(dir, dst, src),
            Node::Adjoint(n) => n.call_into(dir.adj(), dst, src),
            Node::Inverse(n) => n.call_into(dir.inv(), dst, src),
            Node::Compose(a, b) => {
                // (ab)(x) = a(b(x)); (ab)^† = b^† a^†, (ab)^-1 = b^-1 a^-1,
                // (ab)^-† = a^-† b^-†
                let (inner, outer) = match dir {
                    Direction::Forward | Direction::AdjointInverse => (b, a),
                    Direction::Adjoint | Direction::Inverse => (a, b),
                };
                let mid = inner.call_alloc(dir, src);
                outer.call_into(dir, dst, &mid);
            }
            Node::Converted(n, _) => {
                let outer = self.meta_for(dir);
                let native = n.meta_for(dir);
                let conv_src: Vec<F> = src
                    .iter()
                    .map(|x| {
                        let mut f = native.domain.alloc_like(x);
                        f.convert_from(x);
                        f
                    })
                    .collect();
                let mut conv_dst: Vec<F> = dst.iter().map(|x| native.codomain.alloc_like(x)).collect();
                if outer.accept_guess.0 {
                    for (c, d) in conv_dst.iter_mut().zip(dst.iter()) {
                        c.convert_from(d);
                    }
                }
                n.call_into(dir, &mut conv_dst, &conv_src);
                for (d, c) in dst.iter_mut().zip(conv_dst.iter()) {
                    d.convert_from(c);
                }
            }
            Node::Grouped(n, max) => {
                let ns = src.len();
                if ns == 0 {
                    return;
                }
                let m = self.meta_for(dir);
                let total = m.batching.output_len(ns);
                assert!(
                    total % ns == 0,
                    "grouped operator requires an output count that is a multiple of the input count"
                );
                let ratio = total / ns;
                let mut i = 0;
                while i < ns {
                    let g = (*max).min(ns - i);
                    let idxs: Vec<usize> = (0..ratio)
                        .flat_map(|l| (0..g).map(move |j| l * ns + i + j))
                        .collect();
                    let mut chunk: Vec<F> = idxs.iter().map(|&k| dst[k].clone()).collect();
                    n.call_into(dir, &mut chunk, &src[i..i + g]);
                    for (&k, f) in idxs.iter().zip(chunk.into_iter()) {
                        dst[k] = f;
                    }
                    i += g;
                }
            }
        }
    }
}
