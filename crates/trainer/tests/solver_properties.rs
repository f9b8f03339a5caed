use ndarray::{Array1, Array2};
use proptest::prelude::*;
use trainer::ElasticNet;

fn objective(model: &ElasticNet, x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>, b: f64) -> f64 {
    let n = x.nrows() as f64;
    let residual = y - &(x.dot(w) + b);
    let l1: f64 = w.iter().map(|v| v.abs()).sum();
    let l2: f64 = w.dot(w);
    residual.dot(&residual) / (2.0 * n)
        + model.alpha * model.l1_ratio * l1
        + 0.5 * model.alpha * (1.0 - model.l1_ratio) * l2
}

fn problem() -> impl Strategy<Value = (Array2<f64>, Array1<f64>)> {
    (3usize..12, 1usize..4).prop_flat_map(|(n, p)| {
        (
            prop::collection::vec(-5.0f64..5.0, n * p),
            prop::collection::vec(-5.0f64..5.0, n),
        )
            .prop_map(move |(xs, ys)| {
                (
                    Array2::from_shape_vec((n, p), xs).unwrap(),
                    Array1::from(ys),
                )
            })
    })
}

proptest! {
    #[test]
    fn fit_never_does_worse_than_the_intercept_only_model(
        (x, y) in problem(),
        alpha in 0.01f64..2.0,
        l1_ratio in 0.0f64..=1.0,
    ) {
        let model = ElasticNet { alpha, l1_ratio, max_iter: 5_000, tolerance: 1e-10 };
        let fit = model.fit(&x, &y);

        let baseline = objective(&model, &x, &y, &Array1::zeros(x.ncols()), y.mean().unwrap());
        let fitted = objective(&model, &x, &y, &fit.coefficients, fit.intercept);
        prop_assert!(fitted <= baseline + 1e-9);
    }

    #[test]
    fn lasso_penalty_above_every_correlation_gives_an_empty_model((x, y) in problem()) {
        // With centered data, w = 0 is optimal once alpha >= max_j |<x_j, y>| / n.
        let n = x.nrows() as f64;
        let y_centered = &y - y.mean().unwrap();
        let x_means = x.mean_axis(ndarray::Axis(0)).unwrap();
        let x_centered = &x - &x_means;
        let max_corr = x_centered
            .t()
            .dot(&y_centered)
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs() / n));

        let model = ElasticNet { alpha: max_corr + 1e-6, l1_ratio: 1.0, max_iter: 1_000, tolerance: 1e-10 };
        let fit = model.fit(&x, &y);
        prop_assert!(fit.coefficients.iter().all(|w| *w == 0.0));
    }
}
