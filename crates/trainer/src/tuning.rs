use crate::elastic_net::ElasticNet;
use configuration::TuningSettings;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::metrics::r2;

/// Mean held-out R² of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScore {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub mean_r2: f64,
    pub std_r2: f64,
    pub fold_scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResults {
    pub folds: usize,
    pub best_alpha: f64,
    pub best_l1_ratio: f64,
    pub grid: Vec<GridScore>,
}

/// Contiguous, unshuffled fold boundaries. The first `n % k` folds take one
/// extra row.
pub fn fold_ranges(n: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Searches the alpha × l1_ratio grid with k-fold cross-validation.
///
/// Returns `None` when there are fewer than two rows per fold or when no
/// fold can be scored (every held-out target constant). Ties keep the
/// earliest grid point, so the choice is deterministic.
pub fn grid_search(
    x: &Array2<f64>,
    y: &Array1<f64>,
    settings: &TuningSettings,
    max_iter: usize,
    tolerance: f64,
) -> Option<CrossValidationResults> {
    let n = x.nrows();
    if settings.folds < 2 || n < 2 * settings.folds {
        tracing::info!(
            observations = n,
            folds = settings.folds,
            "too few observations for cross-validation, using configured hyper-parameters"
        );
        return None;
    }

    let folds = fold_ranges(n, settings.folds);
    let mut grid = Vec::with_capacity(settings.alphas.len() * settings.l1_ratios.len());

    for &alpha in &settings.alphas {
        for &l1_ratio in &settings.l1_ratios {
            let model = ElasticNet { alpha, l1_ratio, max_iter, tolerance };
            let fold_scores: Vec<f64> = folds
                .iter()
                .filter_map(|held_out| score_fold(&model, x, y, held_out.clone()))
                .collect();
            if fold_scores.is_empty() {
                continue;
            }
            let mean_r2 = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            let std_r2 = (fold_scores.iter().map(|s| (s - mean_r2).powi(2)).sum::<f64>()
                / fold_scores.len() as f64)
                .sqrt();
            tracing::debug!(alpha, l1_ratio, mean_r2, "grid point scored");
            grid.push(GridScore { alpha, l1_ratio, mean_r2, std_r2, fold_scores });
        }
    }

    let best = grid
        .iter()
        .fold(None::<&GridScore>, |best, candidate| match best {
            Some(b) if b.mean_r2 >= candidate.mean_r2 => Some(b),
            _ => Some(candidate),
        })?
        .clone();

    tracing::info!(
        alpha = best.alpha,
        l1_ratio = best.l1_ratio,
        mean_r2 = best.mean_r2,
        "cross-validation selected hyper-parameters"
    );

    Some(CrossValidationResults {
        folds: settings.folds,
        best_alpha: best.alpha,
        best_l1_ratio: best.l1_ratio,
        grid,
    })
}

fn score_fold(
    model: &ElasticNet,
    x: &Array2<f64>,
    y: &Array1<f64>,
    held_out: std::ops::Range<usize>,
) -> Option<f64> {
    let train_idx: Vec<usize> = (0..x.nrows()).filter(|i| !held_out.contains(i)).collect();
    let test_idx: Vec<usize> = held_out.collect();
    score_split(model, x, y, &train_idx, &test_idx)
}

/// Every `stride`-th row is held out, with `stride` the rounded inverse of
/// `test_fraction`. `None` when fewer than two rows would be held out.
pub fn holdout_split(n: usize, test_fraction: f64) -> Option<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0) {
        return None;
    }
    let stride = ((1.0 / test_fraction).round() as usize).max(2);
    let (test, train): (Vec<usize>, Vec<usize>) = (0..n).partition(|i| i % stride == stride - 1);
    (test.len() >= 2).then_some((train, test))
}

/// R² of a model fitted on the training rows of [`holdout_split`] and
/// evaluated on the held-out rows.
pub fn holdout_r2(model: &ElasticNet, x: &Array2<f64>, y: &Array1<f64>, test_fraction: f64) -> Option<f64> {
    let (train, test) = holdout_split(x.nrows(), test_fraction)?;
    if train.len() < x.ncols().max(2) {
        return None;
    }
    let score = score_split(model, x, y, &train, &test);
    tracing::debug!(train = train.len(), test = test.len(), r2 = ?score, "holdout scored");
    score
}

fn score_split(
    model: &ElasticNet,
    x: &Array2<f64>,
    y: &Array1<f64>,
    train_idx: &[usize],
    test_idx: &[usize],
) -> Option<f64> {
    let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();
    let first = *y_test.first()?;
    if y_test.iter().all(|v| *v == first) {
        // R² is undefined against a constant target.
        return None;
    }

    let fit = model.fit(&x.select(Axis(0), train_idx), &y.select(Axis(0), train_idx));
    let predictions = fit.predict(&x.select(Axis(0), test_idx)).to_vec();
    Some(r2(&y_test, &predictions))
}
