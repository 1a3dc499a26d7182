use approx::assert_relative_eq;
use fixpoint::problems::LinearMap;
use fixpoint::{
    Iteration, IterationOptions, IterationResult, Norm, Scheme, SquaremOptions, Termination,
};
use nalgebra::DVector;

fn options(tol: f64, max_evaluations: usize) -> IterationOptions {
    IterationOptions::builder()
        .tol(tol)
        .max_evaluations(max_evaluations)
        .build()
        .unwrap()
}

fn squarem(tol: f64, max_evaluations: usize, scheme: Scheme) -> Iteration {
    let extrapolation = SquaremOptions::builder().scheme(scheme).build().unwrap();
    Iteration::squarem(options(tol, max_evaluations), extrapolation)
}

fn all_methods(tol: f64, max_evaluations: usize) -> Vec<Iteration> {
    vec![
        Iteration::simple(options(tol, max_evaluations)),
        squarem(tol, max_evaluations, Scheme::S1),
        squarem(tol, max_evaluations, Scheme::S2),
        squarem(tol, max_evaluations, Scheme::S3),
    ]
}

/// Halving map `f(x) = 0.5 x` contracts straight to zero.
#[test]
fn halving_map_converges_to_zero() {
    let iteration = Iteration::simple(options(1e-10, 1_000));
    let result = iteration.solve(&DVector::from_vec(vec![1.0]), |x: &DVector<f64>| x * 0.5);

    assert!(result.converged);
    assert_eq!(result.termination, Termination::Converged);
    assert!(result.evaluations < 50);
    assert_relative_eq!(result.final_vector[0], 0.0, epsilon = 1e-9);
}

/// A point that is already fixed is accepted after a single evaluation by every method.
#[test]
fn identity_map_converges_in_one_evaluation() {
    let x0 = DVector::from_vec(vec![3.125]);
    for iteration in all_methods(1e-14, 100) {
        let result = iteration.solve(&x0, |x: &DVector<f64>| x.clone());
        assert!(result.converged);
        assert!(result.evaluations <= 1);
        assert_relative_eq!(result.final_vector[0], 3.125);
    }

    let trivial = Iteration::trivial().solve(&x0, |x: &DVector<f64>| x * 2.0);
    assert!(trivial.converged);
    assert_eq!(trivial.final_vector, x0);
    assert_eq!(trivial.evaluations, 0);
}

/// An exploding, sign-alternating map never converges and stops at the budget.
#[test]
fn divergent_map_exhausts_the_budget() {
    for iteration in all_methods(1e-12, 50) {
        let result = iteration.solve(&DVector::from_vec(vec![1.0, -0.5]), |x: &DVector<f64>| {
            x * -2.0
        });
        assert!(!result.converged);
        assert!(result.evaluations <= 50);
        match result.termination {
            Termination::BudgetExhausted => assert_eq!(result.evaluations, 50),
            Termination::NumericalFailure => {
                assert!(result.final_vector.iter().all(|value| value.is_finite()))
            }
            Termination::Converged => unreachable!("divergent map cannot converge"),
        }
    }

    // Plain iteration only reaches 2^50, which is still finite.
    let simple = Iteration::simple(options(1e-12, 50))
        .solve(&DVector::from_vec(vec![1.0]), |x: &DVector<f64>| x * -2.0);
    assert_eq!(simple.termination, Termination::BudgetExhausted);
    assert_eq!(simple.evaluations, 50);
}

/// NaN on the very first evaluation leaves the initial vector untouched.
#[test]
fn nan_on_first_evaluation_returns_initial_vector() {
    let x0 = DVector::from_vec(vec![0.1, 0.2, 0.3]);
    for iteration in all_methods(1e-12, 100) {
        let result = iteration.solve(&x0, |x: &DVector<f64>| {
            let mut next = x.clone();
            next[1] = f64::NAN;
            next
        });
        assert!(!result.converged);
        assert_eq!(result.termination, Termination::NumericalFailure);
        assert_eq!(result.final_vector, x0);
        assert_eq!(result.evaluations, 1);
    }
}

/// Aborting from inside the contraction is handled like a numerical failure.
#[test]
fn aborted_contraction_reverts_to_last_good_iterate() {
    let iteration = Iteration::simple(options(1e-14, 100));
    let mut calls = 0usize;
    let result = iteration.solve(&DVector::from_vec(vec![8.0]), |x: &DVector<f64>| {
        calls += 1;
        if calls > 2 {
            Err("deadline exceeded")
        } else {
            Ok(x * 0.5)
        }
    });

    assert_eq!(result.termination, Termination::NumericalFailure);
    assert_eq!(result.final_vector[0], 2.0);
    assert_eq!(result.evaluations, 3);
}

/// SQUAREM S3 needs fewer contraction evaluations than plain iteration on a
/// diagonal linear contraction.
#[test]
fn squarem_accelerates_linear_contraction() {
    let map = LinearMap::diagonal(
        DVector::from_vec(vec![0.9, 0.5, 0.8, 0.95]),
        DVector::from_vec(vec![1.0, -1.0, 0.5, 2.0]),
    )
    .unwrap();
    let expected = map.fixed_point().unwrap();
    let x0 = DVector::zeros(map.dimension());

    let simple = Iteration::simple(options(1e-10, 10_000)).solve(&x0, |x: &DVector<f64>| {
        map.apply(x)
    });
    let accelerated =
        squarem(1e-10, 10_000, Scheme::S3).solve(&x0, |x: &DVector<f64>| map.apply(x));

    assert!(simple.converged);
    assert!(accelerated.converged);
    assert_relative_eq!(accelerated.final_vector, expected, epsilon = 1e-8);
    assert!(
        accelerated.evaluations < simple.evaluations,
        "squarem used {} evaluations, simple used {}",
        accelerated.evaluations,
        simple.evaluations
    );
}

/// Evaluation counts respect the budget and match the per-method accounting rules.
#[test]
fn evaluation_accounting_holds_on_random_problems() {
    for seed in 0..8u64 {
        let map = LinearMap::random_diagonal(6, seed);
        let x0 = DVector::from_element(map.dimension(), 1.0);

        for budget in [1, 2, 5, 17, 400] {
            let simple = Iteration::simple(options(1e-12, budget))
                .solve(&x0, |x: &DVector<f64>| map.apply(x));
            assert!(simple.evaluations <= budget);
            assert_eq!(simple.evaluations, simple.iterations);

            for scheme in [Scheme::S1, Scheme::S2, Scheme::S3] {
                let accelerated =
                    squarem(1e-12, budget, scheme).solve(&x0, |x: &DVector<f64>| map.apply(x));
                assert!(accelerated.evaluations <= budget);
                assert!(accelerated.evaluations >= 3 * accelerated.iterations);
                assert_eq!(
                    accelerated.converged,
                    accelerated.termination == Termination::Converged
                );
            }
        }
    }
}

#[test]
fn callback_counts_major_iterations() {
    let map = LinearMap::random_diagonal(4, 3);
    let x0 = DVector::zeros(map.dimension());
    let iteration = squarem(1e-12, 1_000, Scheme::S3);

    let mut ticks = 0usize;
    let result = iteration.solve_with_callback(
        &x0,
        |x: &DVector<f64>| map.apply(x),
        || ticks += 1,
    );
    assert!(result.converged);
    assert_eq!(result.iterations, ticks);
}

#[test]
fn euclidean_norm_is_honoured() {
    let options = IterationOptions::builder()
        .tol(1e-9)
        .norm(Norm::Euclidean)
        .build()
        .unwrap();
    let iteration = Iteration::simple(options);
    let result = iteration.solve(&DVector::from_vec(vec![1.0, 1.0]), |x: &DVector<f64>| x * 0.5);

    assert!(result.converged);
    assert!(result.last_norm < 1e-9);
}

#[test]
fn result_serializes_to_json() {
    let iteration = Iteration::simple(options(1e-6, 100));
    let result = iteration.solve(&DVector::from_vec(vec![1.0]), |x: &DVector<f64>| x * 0.5);

    let json = serde_json::to_string(&result).unwrap();
    let restored: IterationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.termination, Termination::Converged);
    assert_eq!(restored.evaluations, result.evaluations);
}
