//! Pairwise correlation between numeric columns.
//!
//! Missing values are excluded pair by pair: each coefficient uses only the
//! rows where both columns have a value.

use crate::error::{AnalysisError, Result};
use crate::models::{Column, Dataset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correlation coefficient definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Linear (product-moment) correlation.
    #[default]
    Pearson,
    /// Pearson correlation of average ranks.
    Spearman,
    /// Kendall tau-b rank correlation.
    Kendall,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::Pearson => write!(f, "pearson"),
            CorrelationMethod::Spearman => write!(f, "spearman"),
            CorrelationMethod::Kendall => write!(f, "kendall"),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(AnalysisError::UnsupportedOperation(format!(
                "correlation method '{}'",
                other
            ))),
        }
    }
}

impl CorrelationMethod {
    /// Coefficient for two equally long, fully present samples.
    pub fn coefficient(&self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            CorrelationMethod::Pearson => pearson(x, y),
            CorrelationMethod::Spearman => spearman(x, y),
            CorrelationMethod::Kendall => kendall(x, y),
        }
    }
}

/// Pearson correlation; NaN with fewer than two points or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

/// 1-based ranks, ties receiving the average of the positions they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j share the mean of ranks i+1..=j+1
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Kendall tau-b, which corrects for ties in either variable.
pub fn kendall(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }

    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut ties_x, mut ties_y) = (0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 {
                ties_x += 1;
            }
            if dy == 0.0 {
                ties_y += 1;
            }
            let s = dx * dy;
            if s > 0.0 {
                concordant += 1;
            } else if s < 0.0 {
                discordant += 1;
            }
        }
    }

    tau_b(n, concordant - discordant, ties_x, ties_y)
}

/// Tau-b from the pair counts of `n` observations. Counts grow with n^2,
/// so the denominator is formed in floating point.
fn tau_b(n: usize, score: i64, ties_x: i64, ties_y: i64) -> f64 {
    let total = n as f64 * (n - 1) as f64 / 2.0;
    let denom = ((total - ties_x as f64) * (total - ties_y as f64)).sqrt();
    if denom == 0.0 || denom.is_nan() {
        return f64::NAN;
    }
    (score as f64 / denom).clamp(-1.0, 1.0)
}

/// Values of two columns restricted to rows where both are present.
fn complete_pairs(a: &Column, b: &Column) -> (Vec<f64>, Vec<f64>) {
    a.values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .unzip()
}

/// Symmetric correlation matrix with unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Compute the correlation matrix over all numeric columns.
pub fn correlation_matrix(dataset: &Dataset, method: CorrelationMethod) -> CorrelationMatrix {
    let columns: Vec<&Column> = dataset.numeric_columns().collect();
    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];

    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let (x, y) = complete_pairs(columns[i], columns[j]);
            let r = method.coefficient(&x, &y);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        names: columns.iter().map(|c| c.name.clone()).collect(),
        values,
    }
}

/// Strength label of a listed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Strong => write!(f, "Strong"),
            Strength::Moderate => write!(f, "Moderate"),
        }
    }
}

/// A column pair whose absolute correlation reached the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
    pub strength: Strength,
}

/// Full result of a correlation request.
#[derive(Debug, Clone)]
pub struct CorrelationAnalysis {
    pub method: CorrelationMethod,
    pub threshold: f64,
    pub matrix: CorrelationMatrix,
    /// Sorted by descending absolute correlation; ties keep column order.
    pub pairs: Vec<CorrelationPair>,
}

/// Compute the matrix and list every pair `(i, j)`, `i < j`, with
/// `|r| >= threshold`. Pairs at or above `strong` are labeled strong.
pub fn find_correlations(
    dataset: &Dataset,
    method: CorrelationMethod,
    threshold: f64,
    strong: f64,
) -> CorrelationAnalysis {
    let matrix = correlation_matrix(dataset, method);

    let mut pairs = Vec::new();
    for i in 0..matrix.len() {
        for j in (i + 1)..matrix.len() {
            let r = matrix.get(i, j);
            if r.is_nan() || r.abs() < threshold {
                continue;
            }
            pairs.push(CorrelationPair {
                column1: matrix.names[i].clone(),
                column2: matrix.names[j].clone(),
                correlation: r,
                strength: if r.abs() >= strong {
                    Strength::Strong
                } else {
                    Strength::Moderate
                },
            });
        }
    }

    // stable sort keeps first-encountered order among equal magnitudes
    pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));

    CorrelationAnalysis {
        method,
        threshold,
        matrix,
        pairs,
    }
}
