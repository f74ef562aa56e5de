//! Factor correlation matrices.
//!
//! Correlations use pairwise-complete observations: for each factor pair,
//! samples where either value is `NaN` are skipped. Pearson statistics run
//! on trueno vectors; Spearman is Pearson on average ranks; Kendall is
//! tau-b, which corrects for ties.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use trueno::Vector;

use crate::error::{Error, Result};
use crate::factors::{expect_at_least, select_factors, FactorSelection};
use crate::model::{FactorMatrix, LatentModel};

/// Correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    #[default]
    Pearson,
    /// Spearman rank correlation.
    Spearman,
    /// Kendall tau-b.
    Kendall,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
        };
        f.write_str(name)
    }
}

impl FromStr for CorrelationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(Error::InvalidSpecification(format!(
                "unknown correlation method '{other}'"
            ))),
        }
    }
}

/// Square, symmetric matrix of factor correlations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Vec<f32>,
    method: CorrelationMethod,
}

impl CorrelationMatrix {
    /// Factor names labelling rows and columns.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows (and columns).
    #[must_use]
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Method the matrix was computed with.
    #[must_use]
    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Coefficient at (row, col). `NaN` when undefined.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let k = self.size();
        (row < k && col < k).then(|| self.values[row * k + col])
    }

    /// Coefficient between two named factors.
    #[must_use]
    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f32> {
        let row = self.names.iter().position(|n| n == a)?;
        let col = self.names.iter().position(|n| n == b)?;
        self.get(row, col)
    }

    /// Element-wise absolute value.
    #[must_use]
    pub fn abs(mut self) -> Self {
        for v in &mut self.values {
            *v = v.abs();
        }
        self
    }

    /// Whether `m[i][j] == m[j][i]` within `tolerance` (undefined cells must match).
    #[must_use]
    pub fn is_symmetric(&self, tolerance: f32) -> bool {
        let k = self.size();
        (0..k).all(|i| {
            (0..i).all(|j| {
                let (a, b) = (self.values[i * k + j], self.values[j * k + i]);
                (a.is_nan() && b.is_nan()) || (a - b).abs() <= tolerance
            })
        })
    }
}

/// Correlate every pair of columns of `matrix`.
///
/// The diagonal is exactly 1 for every column with at least two finite,
/// non-constant values and `NaN` otherwise.
#[must_use]
pub fn correlate(matrix: &FactorMatrix, method: CorrelationMethod) -> CorrelationMatrix {
    let k = matrix.n_factors();
    let columns: Vec<Vec<f32>> = (0..k).filter_map(|c| matrix.column(c)).collect();
    let mut values = vec![f32::NAN; k * k];

    for i in 0..k {
        for j in i..k {
            let r = if i == j {
                if has_variance(&columns[i]) {
                    1.0
                } else {
                    f32::NAN
                }
            } else {
                let (x, y) = complete_pairs(&columns[i], &columns[j]);
                coefficient(&x, &y, method)
            };
            values[i * k + j] = r;
            values[j * k + i] = r;
        }
    }

    CorrelationMatrix {
        names: matrix.factors().to_vec(),
        values,
        method,
    }
}

/// Absolute factor correlations for a model, intercept excluded.
///
/// # Errors
///
/// Fails when factor selection fails or only the intercept was selected.
pub fn factor_correlation<M: LatentModel + ?Sized>(
    model: &M,
    selection: &FactorSelection,
    method: CorrelationMethod,
) -> Result<CorrelationMatrix> {
    let mut factors = select_factors(model, selection)?;
    if let Some(intercept) = model.intercept_name() {
        let before = factors.len();
        factors.retain(|f| f != intercept);
        if factors.len() != before {
            debug!(intercept, "excluding intercept from correlation");
        }
    }
    expect_at_least(&factors, 1)?;

    let matrix = model.factors(&factors)?;
    debug!(
        %method,
        factors = factors.len(),
        samples = matrix.n_samples(),
        "computing factor correlation"
    );
    Ok(correlate(&matrix, method).abs())
}

fn complete_pairs(x: &[f32], y: &[f32]) -> (Vec<f32>, Vec<f32>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

fn has_variance(column: &[f32]) -> bool {
    let mut finite = column.iter().filter(|v| v.is_finite());
    match finite.next() {
        Some(first) => finite.any(|v| v != first),
        None => false,
    }
}

fn coefficient(x: &[f32], y: &[f32], method: CorrelationMethod) -> f32 {
    if x.len() < 2 {
        return f32::NAN;
    }
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => pearson(&average_ranks(x), &average_ranks(y)),
        CorrelationMethod::Kendall => kendall_tau_b(x, y),
    }
}

/// Pearson correlation of two equal-length, finite samples.
pub(crate) fn pearson(x: &[f32], y: &[f32]) -> f32 {
    let centered = |data: &[f32]| -> Vec<f32> {
        let mean = Vector::from_slice(data).mean().unwrap_or(f32::NAN);
        data.iter().map(|v| v - mean).collect()
    };
    let product_mean = |a: &[f32], b: &[f32]| {
        match Vector::from_slice(a).mul(&Vector::from_slice(b)) {
            Ok(product) => product.mean().unwrap_or(f32::NAN),
            Err(_) => f32::NAN,
        }
    };

    let (dx, dy) = (centered(x), centered(y));
    let covariance = product_mean(&dx, &dy);
    let var_x = product_mean(&dx, &dx);
    let var_y = product_mean(&dy, &dy);

    if var_x > 0.0 && var_y > 0.0 {
        (covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
    } else {
        f32::NAN
    }
}

/// 1-based ranks; ties share the average of their positions.
pub(crate) fn average_ranks(values: &[f32]) -> Vec<f32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + 1 + j) as f32 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        i = j;
    }
    ranks
}

/// Kendall tau-b over all sample pairs.
pub(crate) fn kendall_tau_b(x: &[f32], y: &[f32]) -> f32 {
    let (mut concordant, mut discordant, mut ties_x, mut ties_y) = (0u64, 0u64, 0u64, 0u64);

    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let dx = x[i].partial_cmp(&x[j]);
            let dy = y[i].partial_cmp(&y[j]);
            match (dx, dy) {
                (Some(a), Some(b)) if a.is_eq() && b.is_eq() => {}
                (Some(a), _) if a.is_eq() => ties_x += 1,
                (_, Some(b)) if b.is_eq() => ties_y += 1,
                (Some(a), Some(b)) if a == b => concordant += 1,
                (Some(_), Some(_)) => discordant += 1,
                _ => {}
            }
        }
    }

    tau_b_from_counts(concordant, discordant, ties_x, ties_y)
}

/// tau-b from pair counts. Pairs tied in both variables are in no count.
///
/// The denominator is formed in `f64`, so it stays finite for any sample size.
fn tau_b_from_counts(concordant: u64, discordant: u64, ties_x: u64, ties_y: u64) -> f32 {
    let untied = (concordant + discordant) as f64;
    let denom = ((untied + ties_x as f64) * (untied + ties_y as f64)).sqrt();
    if denom == 0.0 {
        return f32::NAN;
    }
    let tau = (concordant as f64 - discordant as f64) / denom;
    tau.clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;
    use approx::assert_relative_eq;

    fn matrix(columns: &[&[f32]]) -> FactorMatrix {
        let n = columns[0].len();
        let samples = (0..n).map(|i| format!("s{i}")).collect();
        let factors = (0..columns.len()).map(|i| format!("Factor{}", i + 1)).collect();
        let values = (0..n).flat_map(|r| columns.iter().map(move |c| c[r])).collect();
        FactorMatrix::new(samples, factors, values).unwrap()
    }

    #[test]
    fn test_pearson_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(pearson(&x, &[2.0, 4.0, 6.0, 8.0]), 1.0, epsilon = 1e-5);
        assert_relative_eq!(pearson(&x, &[8.0, 6.0, 4.0, 2.0]), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pearson_constant_is_nan() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_average_ranks_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
    }

    #[test]
    fn test_spearman_monotonic() {
        let m = matrix(&[&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 4.0, 9.0, 16.0, 25.0]]);
        let c = correlate(&m, CorrelationMethod::Spearman);
        assert_relative_eq!(c.get(0, 1).unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_kendall_tau_b() {
        assert_relative_eq!(kendall_tau_b(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_relative_eq!(kendall_tau_b(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0);
        // one x-tie: nc=2, nd=0, tx=1, ty=0 -> 2 / sqrt(3 * 2)
        let tau = kendall_tau_b(&[1.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert_relative_eq!(tau, 2.0 / 6.0_f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_tau_b_counts_beyond_i64_product() {
        // 100 000 samples give ~5e9 pairs; the squared count exceeds i64::MAX
        let pairs = 100_000u64 * 99_999 / 2;
        assert_eq!(tau_b_from_counts(pairs, 0, 0, 0), 1.0);
        assert_eq!(tau_b_from_counts(0, pairs, 0, 0), -1.0);

        let tau = tau_b_from_counts(pairs / 2, 0, pairs / 2, 0);
        assert_relative_eq!(tau, 1.0 / 2.0_f32.sqrt(), epsilon = 1e-6);
        assert!((-1.0..=1.0).contains(&tau_b_from_counts(pairs, 1, 3, 7)));
        assert!(tau_b_from_counts(0, 0, 0, 0).is_nan());
    }

    #[test]
    fn test_pairwise_complete() {
        let m = matrix(&[&[1.0, 2.0, f32::NAN, 4.0, 5.0], &[2.0, 4.0, 100.0, 8.0, 10.0]]);
        let c = correlate(&m, CorrelationMethod::Pearson);
        assert_relative_eq!(c.get(0, 1).unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_symmetric_unit_diagonal() {
        let m = matrix(&[
            &[1.0, 2.0, 3.0, 4.0],
            &[0.5, -1.0, 2.0, 0.0],
            &[3.0, 1.0, 2.0, 5.0],
        ]);
        for method in [
            CorrelationMethod::Pearson,
            CorrelationMethod::Spearman,
            CorrelationMethod::Kendall,
        ] {
            let c = correlate(&m, method);
            assert!(c.is_symmetric(0.0));
            for i in 0..3 {
                assert_eq!(c.get(i, i), Some(1.0));
            }
        }
    }

    #[test]
    fn test_constant_column_diagonal_is_nan() {
        let m = matrix(&[&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]]);
        let c = correlate(&m, CorrelationMethod::Pearson);
        assert!(c.get(0, 0).unwrap().is_nan());
        assert!(c.get(0, 1).unwrap().is_nan());
        assert!(c.is_symmetric(0.0));
    }

    #[test]
    fn test_factor_correlation_excludes_intercept_and_takes_abs() {
        let model = InMemoryModel::new()
            .samples(&["a", "b", "c", "d"])
            .factors(
                &["intercept", "Factor1", "Factor2"],
                vec![1.0, 1.0, 4.0, 1.0, 2.0, 3.0, 1.0, 3.0, 2.0, 1.0, 4.0, 1.0],
            )
            .intercept(true)
            .build()
            .unwrap();
        let sel = FactorSelection::names(&["intercept", "Factor1", "Factor2"]);
        let c = factor_correlation(&model, &sel, CorrelationMethod::Pearson).unwrap();
        assert_eq!(c.names(), &["Factor1".to_string(), "Factor2".to_string()]);
        let r = c.get_by_name("Factor1", "Factor2").unwrap();
        assert_relative_eq!(r, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            "Kendall".parse::<CorrelationMethod>().unwrap(),
            CorrelationMethod::Kendall
        );
        assert!("cosine".parse::<CorrelationMethod>().is_err());
        assert_eq!(CorrelationMethod::Spearman.to_string(), "spearman");
    }
}
