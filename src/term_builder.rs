//! Convenience layer that turns application-level atom keys directly into
//! [`ObjectiveTerm`]s, instead of callers having to intern indices and build
//! [`Hyperplane`]s by hand.
//!
//! Not part of the grounding pipeline this reasoner sits downstream of —
//! added the way this workspace's `loaders` crate added a friendlier
//! construction path in front of the raw `LinearProgram`/`NonlinearProgram`
//! containers.

use crate::atom_store::AtomStore;
use crate::hyperplane::Hyperplane;
use crate::term::{InequalitySense, ObjectiveTerm};
use crate::term_store::TermStore;
use crate::variable::GlobalIndex;

/// Builds terms against an [`AtomStore`] keyed on `K`, interning atoms on
/// first use and writing finished terms into a [`TermStore`].
pub struct TermBuilder<'a, K, S: AtomStore<K>> {
    atoms: &'a mut S,
    store: TermStore,
    _marker: std::marker::PhantomData<K>,
}

impl<'a, K, S: AtomStore<K>> TermBuilder<'a, K, S> {
    pub fn new(atoms: &'a mut S) -> Self {
        Self {
            atoms,
            store: TermStore::new(),
            _marker: std::marker::PhantomData,
        }
    }

    fn indices(&mut self, atoms: impl IntoIterator<Item = K>) -> Vec<GlobalIndex> {
        atoms.into_iter().map(|a| self.atoms.intern(a)).collect()
    }

    /// `weight · max(0, Σ coefficients·atoms − constant)`
    pub fn hinge(&mut self, coefficients: Vec<f32>, atoms: impl IntoIterator<Item = K>, constant: f32, weight: f32) {
        let vars = self.indices(atoms);
        let hp = Hyperplane::new(coefficients, constant, vars);
        self.store.add(ObjectiveTerm::hinge(hp, weight));
    }

    /// `weight · max(0, Σ coefficients·atoms − constant)²`
    pub fn squared_hinge(
        &mut self,
        coefficients: Vec<f32>,
        atoms: impl IntoIterator<Item = K>,
        constant: f32,
        weight: f32,
    ) {
        let vars = self.indices(atoms);
        let hp = Hyperplane::new(coefficients, constant, vars);
        self.store.add(ObjectiveTerm::squared_hinge(hp, weight));
    }

    /// `Σ coefficients·atoms = constant`
    pub fn linear_equality(&mut self, coefficients: Vec<f32>, atoms: impl IntoIterator<Item = K>, constant: f32) {
        let vars = self.indices(atoms);
        let hp = Hyperplane::new(coefficients, constant, vars);
        self.store.add(ObjectiveTerm::linear_equality(hp));
    }

    /// `Σ coefficients·atoms ≤/≥ constant`, per `sense`.
    pub fn linear_inequality(
        &mut self,
        coefficients: Vec<f32>,
        atoms: impl IntoIterator<Item = K>,
        constant: f32,
        sense: InequalitySense,
    ) {
        let vars = self.indices(atoms);
        let hp = Hyperplane::new(coefficients, constant, vars);
        self.store.add(ObjectiveTerm::linear_inequality(hp, sense));
    }

    /// `Σ coefficients·atoms ≤ constant`
    pub fn at_most(&mut self, coefficients: Vec<f32>, atoms: impl IntoIterator<Item = K>, constant: f32) {
        self.linear_inequality(coefficients, atoms, constant, InequalitySense::AtMost);
    }

    /// `Σ coefficients·atoms ≥ constant`
    pub fn at_least(&mut self, coefficients: Vec<f32>, atoms: impl IntoIterator<Item = K>, constant: f32) {
        self.linear_inequality(coefficients, atoms, constant, InequalitySense::AtLeast);
    }

    /// Consumes the builder, returning the assembled [`TermStore`].
    pub fn build(self) -> TermStore {
        self.store
    }
}
