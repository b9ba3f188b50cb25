/// Column-wise standardization to zero mean and unit (population) variance.
/// Zero-variance columns become all zeros.
pub fn standardize(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(width) = matrix.first().map(Vec::len) else {
        return Vec::new();
    };
    let n = matrix.len() as f64;

    let mut means = vec![0.0; width];
    for row in matrix {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);

    let mut stds = vec![0.0; width];
    for row in matrix {
        for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2);
        }
    }
    stds.iter_mut().for_each(|s| *s = (*s / n).sqrt());

    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(&means)
                .zip(&stds)
                .map(|((v, m), s)| if *s > f64::EPSILON { (v - m) / s } else { 0.0 })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_columns() {
        let scaled = standardize(&[vec![1.0, 5.0], vec![3.0, 5.0]]);
        assert_eq!(scaled, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_empty_matrix() {
        assert!(standardize(&[]).is_empty());
    }
}
