//! Barycentric Lagrange interpolation over a small window of abscissae.

///
/// Barycentric coefficients `1 / prod_{j != i} (x_i - x_j)` for distinct `points`.
///
pub fn lagrange_coeffs(points: &[f64], coeffs: &mut [f64])
{
    for (i, coeff) in coeffs.iter_mut().enumerate().take(points.len())
    {
        let mut li = 1.0;
        for (j, &xj) in points.iter().enumerate()
        {
            if i != j
            {
                li *= points[i] - xj;
            }
        }
        *coeff = 1.0 / li;
    }
}

///
/// Computes the Lagrange weights at `x` into `weights` without allocating.
/// If `x` coincides with one of the `points` the weight vector is the unit
/// vector for that point, so stored values are reproduced exactly.
///
#[inline]
pub fn lagrange_weights(x: f64, coeffs: &[f64], points: &[f64], weights: &mut [f64])
{
    let weights = &mut weights[..points.len()];
    weights.fill(0.0);

    // handle case where point coincides with one of our nodes...
    if let Some(i) = points.iter().position(|&point| point == x)
    {
        weights[i] = 1.0;
        return;
    }
    let mut normalization_factor = 0.0;
    coeffs.iter().zip(points).zip(weights.iter_mut()).for_each(|((&coeff, &xi), weight)|
    {
        *weight = coeff / (x - xi);
        normalization_factor += *weight;
    });
    weights.iter_mut().for_each(|w| *w /= normalization_factor);
}

#[test]
fn test_lagrange_weights()
{
    let points = [0.0, 0.25, 0.7, 1.0];
    let mut coeffs = [0.0; 4];
    let mut weights = [0.0; 4];
    lagrange_coeffs(&points, &mut coeffs);
    lagrange_weights(0.2, &coeffs, &points, &mut weights);
    // cubic polynomials are reproduced exactly
    let f = |x: f64| 1.0 - 2.0 * x + 3.0 * x * x * x;
    let y: f64 = weights.iter().zip(points).map(|(&w, x)| w * f(x)).sum();
    assert!((y - f(0.2)).abs() < 1e-14);
    assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-14);
}

#[test]
fn test_lagrange_weights_at_node()
{
    let points = [1.0, 2.0, 4.0];
    let mut coeffs = [0.0; 3];
    let mut weights = [0.5; 5];
    lagrange_coeffs(&points, &mut coeffs);
    lagrange_weights(2.0, &coeffs, &points, &mut weights);
    assert_eq!(&weights[..3], &[0.0, 1.0, 0.0]);
}
