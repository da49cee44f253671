//! The ground rule database: every [`ObjectiveTerm`] plus the consensus
//! array `z` they are all coupled to.
//!
//! Grounded on this workspace's `LinearProgram`/`NonlinearProgram` problem
//! containers, which likewise own both the problem data and the dense
//! arrays a solver iterates over; here the "problem data" is the term list
//! and the "solution array" is the consensus vector `z`.

use rand::Rng;
use rand::rngs::StdRng;

use crate::atom_store::AtomValues;
use crate::config::InitialValue;
use crate::term::ObjectiveTerm;
use crate::variable::{GlobalIndex, LocalVariableRef};

/// Owns every ground rule term and the shared consensus variables they are
/// ADMM-coupled through.
///
/// `locals_index[g]` lists every `(term, slot)` pair whose local variable is
/// coupled to consensus variable `g` — the inverted index the variable phase
/// walks to average local copies back into `z`.
#[derive(Debug, Clone, Default)]
pub struct TermStore {
    terms: Vec<ObjectiveTerm>,
    z: Vec<f32>,
    locals_index: Vec<Vec<LocalVariableRef>>,
}

impl TermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term and registers its local variables against their
    /// consensus indices, growing `z` (and the inverted index) as needed to
    /// cover every global index the term references.
    pub fn add(&mut self, term: ObjectiveTerm) {
        let term_idx = self.terms.len();
        for (slot, local) in term.locals().iter().enumerate() {
            let g = local.global_index as usize;
            if g >= self.z.len() {
                self.z.resize(g + 1, 0.0);
                self.locals_index.resize(g + 1, Vec::new());
            }
            self.locals_index[g].push(LocalVariableRef { term: term_idx, slot });
        }
        self.terms.push(term);
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn num_globals(&self) -> usize {
        self.z.len()
    }

    /// Total count of `LocalVariable`s across every term — not `num_globals`,
    /// since a consensus variable referenced by several terms owns one
    /// local copy per reference.
    pub fn num_locals(&self) -> usize {
        self.terms.iter().map(|t| t.locals().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    pub fn terms_mut(&mut self) -> &mut [ObjectiveTerm] {
        &mut self.terms
    }

    pub fn z(&self) -> &[f32] {
        &self.z
    }

    pub fn z_mut(&mut self) -> &mut [f32] {
        &mut self.z
    }

    /// Local variable refs coupled to consensus index `g`.
    pub fn locals_for(&self, g: GlobalIndex) -> &[LocalVariableRef] {
        &self.locals_index[g as usize]
    }

    /// Splits the store into a mutable term slice and a read-only view of
    /// `z`, for the term phase (every term reads `z`, writes only its own
    /// locals).
    pub fn terms_mut_with_z(&mut self) -> (&mut [ObjectiveTerm], &[f32]) {
        (&mut self.terms, &self.z)
    }

    /// Splits the store into a mutable `z` and read-only views of the
    /// inverted index and the terms, for the variable phase (every index
    /// `g` reads its own `locals[g]`, writes only `z[g]`).
    pub fn z_mut_with_locals(&mut self) -> (&mut [f32], &[Vec<LocalVariableRef>], &[ObjectiveTerm]) {
        (&mut self.z, &self.locals_index, &self.terms)
    }

    /// Sets every term's local copies per `policy`; `y` is always reset to
    /// zero. `atoms` is consulted only for [`InitialValue::Atom`]; missing
    /// atom values (or no `atoms` at all) fall back to `0.0`.
    pub fn reset_locals(&mut self, policy: InitialValue, atoms: Option<&dyn AtomValues>, rng: &mut StdRng) {
        for term in self.terms.iter_mut() {
            for l in term.locals_mut() {
                l.value = sample(policy, l.global_index, atoms, rng);
                l.lagrange = 0.0;
            }
        }
    }

    /// Sets every entry of `z` per `policy`, same semantics as
    /// [`TermStore::reset_locals`].
    pub fn init_consensus(&mut self, policy: InitialValue, atoms: Option<&dyn AtomValues>, rng: &mut StdRng) {
        for (g, z_g) in self.z.iter_mut().enumerate() {
            *z_g = sample(policy, g as GlobalIndex, atoms, rng);
        }
    }

    /// Overwrites `z` with whatever values `atoms` currently holds, leaving
    /// any index `atoms` has no value for untouched.
    pub fn get_atom_values(&mut self, atoms: &dyn AtomValues) {
        for (g, z_g) in self.z.iter_mut().enumerate() {
            if let Some(v) = atoms.atom_value(g as GlobalIndex) {
                *z_g = v;
            }
        }
    }

    /// Pushes the converged `z` back into `atoms`, one `set_atom_value` per
    /// global index.
    pub fn write_back(&self, atoms: &mut dyn AtomValues) {
        for (g, &z_g) in self.z.iter().enumerate() {
            atoms.set_atom_value(g as GlobalIndex, z_g);
        }
    }
}

fn sample(policy: InitialValue, g: GlobalIndex, atoms: Option<&dyn AtomValues>, rng: &mut StdRng) -> f32 {
    match policy {
        InitialValue::Zero => 0.0,
        InitialValue::Random => rng.gen_range(0.0..=1.0),
        InitialValue::Atom => atoms.and_then(|a| a.atom_value(g)).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom_store::{AtomStore, AtomValues, HashMapAtomStore};
    use crate::hyperplane::Hyperplane;
    use rand::SeedableRng;

    fn eq_term(vars: &[GlobalIndex]) -> ObjectiveTerm {
        let coeffs = vec![1.0; vars.len()];
        ObjectiveTerm::linear_equality(Hyperplane::new(coeffs, 0.0, vars.to_vec()))
    }

    #[test]
    fn adding_terms_grows_z_and_the_inverted_index() {
        let mut store = TermStore::new();
        store.add(eq_term(&[0, 2]));
        assert_eq!(store.num_globals(), 3);
        assert_eq!(store.num_terms(), 1);
        assert_eq!(store.num_locals(), 2);
        assert!(store.locals_for(1).is_empty());
        assert_eq!(store.locals_for(2).len(), 1);
    }

    #[test]
    fn shared_global_indices_accumulate_multiple_local_refs() {
        let mut store = TermStore::new();
        store.add(eq_term(&[0, 1]));
        store.add(eq_term(&[1, 2]));
        assert_eq!(store.locals_for(1).len(), 2);
        assert_eq!(store.num_locals(), 4);
    }

    #[test]
    fn reset_locals_zero_clears_values_and_lagrange() {
        let mut store = TermStore::new();
        store.add(eq_term(&[0, 1]));
        let mut rng = StdRng::seed_from_u64(0);
        store.reset_locals(InitialValue::Zero, None, &mut rng);
        for term in store.terms() {
            assert!(term.locals().iter().all(|l| l.value == 0.0 && l.lagrange == 0.0));
        }
    }

    #[test]
    fn init_consensus_atom_policy_reads_through_atom_values() {
        let mut store = TermStore::new();
        store.add(eq_term(&[0]));
        let mut atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
        let idx = atoms.intern("a");
        atoms.set_atom_value(idx, 0.37);
        let mut rng = StdRng::seed_from_u64(0);
        store.init_consensus(InitialValue::Atom, Some(&atoms), &mut rng);
        assert_eq!(store.z()[0], 0.37);
    }

    #[test]
    fn write_back_pushes_z_into_the_atom_store() {
        let mut store = TermStore::new();
        store.add(eq_term(&[0]));
        store.z_mut()[0] = 0.9;
        let mut atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
        atoms.intern("a");
        store.write_back(&mut atoms);
        assert_eq!(atoms.atom_value(0), Some(0.9));
    }
}
