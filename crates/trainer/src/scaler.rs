use ndarray::{Array2, Axis};

// Columns with a population standard deviation at or below this are constant.
const ZERO_VARIANCE_STD: f64 = 1e-12;

/// Column-wise standardization to zero mean and unit population variance.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl FeatureScaler {
    /// Fits column statistics. An empty matrix yields zero means and stds.
    pub fn fit(data: &Array2<f64>) -> Self {
        let means = data
            .mean_axis(Axis(0))
            .map(|means| means.to_vec())
            .unwrap_or_else(|| vec![0.0; data.ncols()]);
        let stds = if data.nrows() == 0 {
            vec![0.0; data.ncols()]
        } else {
            data.std_axis(Axis(0), 0.0).to_vec()
        };
        Self { means, stds }
    }

    pub fn from_parts(means: Vec<f64>, stds: Vec<f64>) -> Self {
        Self { means, stds }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Indices of columns that carry no information.
    pub fn zero_variance_columns(&self) -> Vec<usize> {
        self.stds
            .iter()
            .enumerate()
            .filter(|(_, std)| **std <= ZERO_VARIANCE_STD)
            .map(|(j, _)| j)
            .collect()
    }

    /// Standardizes `data`. Constant columns map to zero.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut scaled = data.to_owned();
        for (j, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            column.mapv_inplace(|v| {
                if std > ZERO_VARIANCE_STD {
                    (v - mean) / std
                } else {
                    0.0
                }
            });
        }
        scaled
    }
}
