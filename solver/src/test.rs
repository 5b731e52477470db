#![cfg(test)]

use ndarray::{array, prelude::*};

use crate::{
    Algorithm, ForwardModel, SolverConfig, SolverErr, Stats,
    algorithm::MAX_ITERATIONS,
    linalg,
};

fn small_model() -> ForwardModel {
    let raw = array![
        [4., 1., 0., 2.],
        [1., 3., 1., 0.],
        [0., 1., 5., 1.],
        [2., 0., 1., 6.],
        [1., 2., 3., 4.],
        [3., 1., 2., 1.],
    ];

    ForwardModel::new(raw).unwrap()
}

fn wide_model(rows: usize, cols: usize) -> ForwardModel {
    let raw = Array2::from_shape_fn((rows, cols), |(i, j)| {
        ((i * 31 + j * 17) % 23) as f32 / 23. + if i % cols == j { 2. } else { 0. }
    });

    ForwardModel::new(raw).unwrap()
}

fn normalized(mut g: Vec<f32>) -> Array1<f32> {
    Stats::of(&g).normalize(&mut g);
    Array1::from(g)
}

fn residual_norm(model: &ForwardModel, f: &[f32], g: ArrayView1<f32>) -> f64 {
    let mut hf = Array1::zeros(model.rows());
    model.apply(ArrayView1::from(f), hf.view_mut());
    linalg::norm((&g - &hf).view())
}

#[test]
fn test_solution_has_model_columns_within_the_cap() {
    let model = wide_model(64, 16);
    let g = normalized((0..64).map(|i| ((i * 7) % 11) as f32).collect());

    for algorithm in Algorithm::ALL {
        let solution = algorithm.solve(&model, g.view()).unwrap();

        assert_eq!(solution.values().len(), model.cols());
        assert!(solution.iterations() <= MAX_ITERATIONS);
        assert!(solution.values().iter().all(|x| x.is_finite()));
    }
}

#[test]
fn test_consistent_system_is_reconstructed() {
    let model = small_model();
    let f_true = array![1., -0.5, 2., 0.25];
    let mut g = Array1::zeros(model.rows());
    model.apply(f_true.view(), g.view_mut());

    let g_norm = linalg::norm(g.view());

    for algorithm in Algorithm::ALL {
        let solution = algorithm.solve(&model, g.view()).unwrap();
        let residual = residual_norm(&model, solution.values(), g.view());

        assert!(
            residual < 0.1 * g_norm,
            "{algorithm}: residual {residual} for a signal of norm {g_norm}"
        );
    }
}

#[test]
fn test_solve_is_deterministic() {
    let model = wide_model(48, 9);
    let g = normalized((0..48).map(|i| (i as f32 * 0.37).cos()).collect());

    for algorithm in Algorithm::ALL {
        let first = algorithm.solve(&model, g.view()).unwrap();
        let second = algorithm.solve(&model, g.view()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_constant_signal_yields_a_zero_solution() {
    let model = small_model();
    let g = normalized(vec![7.5; model.rows()]);
    assert!(g.iter().all(|&x| x == 0.));

    for algorithm in Algorithm::ALL {
        let solution = algorithm.solve(&model, g.view()).unwrap();

        assert_eq!(solution.iterations(), 0);
        assert!(solution.values().iter().all(|&x| x == 0.));
    }
}

#[test]
fn test_signal_length_must_match_the_model_rows() {
    let model = small_model();
    let g = Array1::zeros(model.rows() + 1);

    for algorithm in Algorithm::ALL {
        let res = algorithm.solve(&model, g.view());
        assert!(matches!(
            res,
            Err(SolverErr::SizeMismatch {
                what: "signal",
                got: 7,
                expected: 6
            })
        ));
    }
}

#[test]
fn test_iteration_cap_is_respected() {
    let model = wide_model(64, 16);
    let g = normalized((0..64).map(|i| ((i * 5) % 13) as f32).collect());
    let config = SolverConfig {
        max_iterations: 2,
        tolerance: 0.,
    };

    for algorithm in Algorithm::ALL {
        let solution = algorithm.solve_with(config, &model, g.view()).unwrap();
        assert_eq!(solution.iterations(), 2);
    }
}

#[test]
fn test_cgnr_residual_never_grows() {
    let model = wide_model(64, 16);
    let g = normalized((0..64).map(|i| ((i * 3) % 7) as f32 - (i % 2) as f32).collect());
    let mut last = linalg::norm(g.view());

    for max_iterations in 1..=MAX_ITERATIONS {
        let config = SolverConfig {
            max_iterations,
            tolerance: 0.,
        };

        let solution = Algorithm::Cgnr
            .solve_with(config, &model, g.view())
            .unwrap();
        let residual = residual_norm(&model, solution.values(), g.view());

        assert!(residual <= last * (1. + 1e-4), "{residual} > {last}");
        last = residual;
    }
}
