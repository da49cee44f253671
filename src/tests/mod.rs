//! End-to-end scenarios run against the public API instead of a single
//! module's internals — the reasoner, the term store, and `TermBuilder`
//! wired together the way a caller would use them.

use crate::atom_store::{AtomStore, AtomValues, HashMapAtomStore};
use crate::callback::NoOpCallback;
use crate::config::InitialValue;
use crate::hyperplane::Hyperplane;
use crate::reasoner::{AdmmHooks, AdmmReasoner, Reasoner};
use crate::term::{InequalitySense, ObjectiveTerm};
use crate::term_builder::TermBuilder;
use crate::term_store::TermStore;
use crate::terminators::{NoOpTerminator, TimeOutTerminator};
use crate::{Options, Status};

fn hooks() -> AdmmHooks {
    AdmmHooks::new(Box::new(NoOpCallback::new(&Options::new())), Box::new(NoOpTerminator::default()))
}

#[test]
fn converged_z_always_stays_in_the_unit_interval() {
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::hinge(Hyperplane::new(vec![1.0, 1.0], 1.0, vec![0, 1]), 3.0));
    store.add(ObjectiveTerm::linear_equality(Hyperplane::new(vec![1.0, -1.0], 0.3, vec![0, 1])));

    let options = Options::new();
    let mut reasoner = AdmmReasoner::new(&options);
    reasoner.optimize(&mut store, None, &mut hooks()).expect("solve should succeed");

    for &z_g in store.z() {
        assert!((0.0..=1.0).contains(&z_g), "z escaped [0, 1]: {z_g}");
    }
}

#[test]
fn inequality_constraint_keeps_the_sum_under_its_bound() {
    // x1 + x2 <= 0.5, starting from the infeasible point z = [1, 1]. Seeded
    // through an atom store with `initial_consensus_value = Atom`: optimize()
    // unconditionally reseeds consensus from that policy, so a manual
    // `z_mut()` write would otherwise be silently overwritten before the
    // first iteration ever runs.
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::linear_inequality(
        Hyperplane::new(vec![1.0, 1.0], 0.5, vec![0, 1]),
        InequalitySense::AtMost,
    ));

    let mut atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
    let a = atoms.intern("a");
    let b = atoms.intern("b");
    atoms.set_atom_value(a, 1.0);
    atoms.set_atom_value(b, 1.0);

    let mut options = Options::new();
    options.set_option("initial_consensus_value", InitialValue::Atom).unwrap();
    let mut reasoner = AdmmReasoner::new(&options);
    let report = reasoner
        .optimize(&mut store, Some(&mut atoms), &mut hooks())
        .expect("solve should succeed");

    assert_eq!(report.violated_constraints, 0);
    assert!(store.z()[0] + store.z()[1] <= 0.5 + 1e-2);
}

#[test]
fn two_coupled_squared_hinges_land_on_the_shared_minimum() {
    // (x1+x2-1)^2 and (x1-x3)^2 share x1. Both terms can reach zero
    // simultaneously at any point with x1 + x2 = 1 and x1 = x3, so the
    // objective should settle near zero and both relations should hold,
    // rather than pinning z to one specific triple.
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::squared_hinge(Hyperplane::new(vec![1.0, 1.0], 1.0, vec![0, 1]), 1.0));
    store.add(ObjectiveTerm::squared_hinge(Hyperplane::new(vec![1.0, -1.0], 0.0, vec![0, 2]), 1.0));

    let options = Options::new();
    let mut reasoner = AdmmReasoner::new(&options);
    let report = reasoner.optimize(&mut store, None, &mut hooks()).expect("solve should succeed");

    assert!(report.objective.unwrap_or(f32::MAX) < 1e-3);
    assert!((store.z()[0] + store.z()[1] - 1.0).abs() < 1e-2);
    assert!((store.z()[0] - store.z()[2]).abs() < 1e-2);
}

#[test]
fn infeasible_equalities_report_violations_and_do_not_panic() {
    // x1 = 0.2 and x1 = 0.8 cannot both hold.
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::linear_equality(Hyperplane::new(vec![1.0], 0.2, vec![0])));
    store.add(ObjectiveTerm::linear_equality(Hyperplane::new(vec![1.0], 0.8, vec![0])));

    let mut options = Options::new();
    options.set_option("max_iterations", 1000u32).unwrap();
    let mut reasoner = AdmmReasoner::new(&options);
    let report = reasoner.optimize(&mut store, None, &mut hooks()).expect("solve should not error");

    assert!(report.violated_constraints >= 1);
}

fn build_three_term_problem() -> TermStore {
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::hinge(Hyperplane::new(vec![1.0, 1.0], 1.0, vec![0, 1]), 2.0));
    store.add(ObjectiveTerm::squared_hinge(Hyperplane::new(vec![1.0, -1.0], 0.0, vec![1, 2]), 1.0));
    store.add(ObjectiveTerm::linear_inequality(
        Hyperplane::new(vec![1.0], 0.9, vec![2]),
        InequalitySense::AtMost,
    ));
    store
}

#[test]
fn objective_agrees_across_thread_counts() {
    // The same problem solved single- and multi-threaded should land on
    // the same objective, since every global index's consensus update is
    // independent of how terms are chunked across workers.
    let mut store_one = build_three_term_problem();
    let mut options_one = Options::new();
    options_one.set_option("num_threads", 1usize).unwrap();
    let report_one = AdmmReasoner::new(&options_one)
        .optimize(&mut store_one, None, &mut hooks())
        .expect("single-threaded solve should succeed");

    let mut store_many = build_three_term_problem();
    let mut options_many = Options::new();
    options_many.set_option("num_threads", 8usize).unwrap();
    let report_many = AdmmReasoner::new(&options_many)
        .optimize(&mut store_many, None, &mut hooks())
        .expect("multi-threaded solve should succeed");

    let obj_one = report_one.objective.expect("objective should have been computed");
    let obj_many = report_many.objective.expect("objective should have been computed");
    assert!((obj_one - obj_many).abs() < 1e-3, "{obj_one} vs {obj_many}");
}

#[test]
fn term_builder_insertion_order_does_not_change_the_solve() {
    // Interning the same atoms in a different order should not change the
    // converged result.
    let mut forward_atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
    let mut forward = TermBuilder::new(&mut forward_atoms);
    forward.hinge(vec![1.0, 1.0], ["a", "b"], 1.0, 1.0);
    forward.linear_equality(vec![1.0, -1.0], ["a", "b"], 0.0);
    let mut forward_store = forward.build();

    let mut reverse_atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
    let mut reverse = TermBuilder::new(&mut reverse_atoms);
    reverse.hinge(vec![1.0, 1.0], ["b", "a"], 1.0, 1.0);
    reverse.linear_equality(vec![1.0, -1.0], ["b", "a"], 0.0);
    let mut reverse_store = reverse.build();

    let options = Options::new();
    AdmmReasoner::new(&options)
        .optimize(&mut forward_store, None, &mut hooks())
        .expect("forward-order solve should succeed");
    AdmmReasoner::new(&options)
        .optimize(&mut reverse_store, None, &mut hooks())
        .expect("reverse-order solve should succeed");

    let a_forward = forward_store.z()[forward_atoms.index_of(&"a").unwrap() as usize];
    let a_reverse = reverse_store.z()[reverse_atoms.index_of(&"a").unwrap() as usize];
    assert!((a_forward - a_reverse).abs() < 1e-2);
}

#[test]
fn configuration_errors_surface_before_any_iteration_runs() {
    let mut store = TermStore::new();
    store.add(ObjectiveTerm::linear_equality(Hyperplane::new(vec![1.0], 0.0, vec![0])));

    let mut bad_step = Options::new();
    bad_step.set_option("step_size", -1.0f32).unwrap();
    let err = AdmmReasoner::new(&bad_step).optimize(&mut store, None, &mut hooks()).unwrap_err();
    assert!(format!("{err}").to_lowercase().contains("step_size"));

    let mut bad_iters = Options::new();
    bad_iters.set_option("max_iterations", 0u32).unwrap();
    assert!(AdmmReasoner::new(&bad_iters).optimize(&mut store, None, &mut hooks()).is_err());
}

#[test]
fn a_timeout_terminator_stops_the_loop_and_still_writes_back() {
    let mut atoms: HashMapAtomStore<&str> = HashMapAtomStore::new();
    let mut builder = TermBuilder::new(&mut atoms);
    builder.linear_equality(vec![1.0], ["a"], 0.5);
    let mut store = builder.build();

    let mut options = Options::new();
    options.set_option("max_iterations", 1_000_000u32).unwrap();
    let mut reasoner = AdmmReasoner::new(&options);
    let mut hooks = AdmmHooks::new(
        Box::new(NoOpCallback::new(&Options::new())),
        Box::new(TimeOutTerminator::new(0)),
    );

    let report = reasoner
        .optimize(&mut store, Some(&mut atoms), &mut hooks)
        .expect("solve should stop cleanly, not error");

    assert_eq!(report.status, Status::TimeLimit);
    assert_eq!(atoms.atom_value(atoms.index_of(&"a").unwrap()), Some(store.z()[0]));
}
