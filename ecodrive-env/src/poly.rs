//! Dense univariate polynomials and Lagrange interpolation.
//!
//! Coefficients are stored lowest order first: `[c0, c1, c2, c3]`
//! represents `c0 + c1 x + c2 x^2 + c3 x^3`.

/// A dense univariate polynomial with `f64` coefficients, lowest order
/// first. The coefficient vector is never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    coeffs: Vec<f64>,
}

impl Poly {
    /// Creates a polynomial from coefficients, lowest order first.
    pub fn new(coeffs: Vec<f64>) -> Self {
        if coeffs.is_empty() {
            return Self::constant(0.0);
        }
        Self { coeffs }
    }

    /// Creates a constant polynomial.
    pub fn constant(c: f64) -> Self {
        Self { coeffs: vec![c] }
    }

    /// The degree of the stored coefficient vector (trailing zeros count).
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficients, lowest order first.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// The coefficient of the given order, zero if beyond the degree.
    pub fn coeff(&self, order: usize) -> f64 {
        self.coeffs.get(order).copied().unwrap_or(0.0)
    }

    /// Evaluates the polynomial at `x` by Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    /// Multiplies two polynomials.
    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            for (j, &b) in other.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Poly::new(out)
    }

    /// Multiplies every coefficient by a scalar.
    pub fn scale(&self, s: f64) -> Poly {
        Poly::new(self.coeffs.iter().map(|&c| c * s).collect())
    }

    /// Adds two polynomials.
    pub fn add(&self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.coeff(i) + other.coeff(i);
        }
        Poly::new(out)
    }

    /// Fits the unique degree-`n` polynomial through `n + 1` distinct
    /// `(node, value)` pairs.
    ///
    /// For each node `k` the Lagrange basis polynomial is built by
    /// iterated multiplication of the normalized linear factors
    /// `(x - x_j) / (x_k - x_j)` over all `j != k`; the interpolant is
    /// the sum of the bases scaled by the target values. Returns the
    /// interpolant together with the basis polynomials.
    ///
    /// Nodes must be pairwise distinct.
    pub fn lagrange_fit(nodes: &[f64], values: &[f64]) -> (Poly, Vec<Poly>) {
        debug_assert_eq!(nodes.len(), values.len());
        debug_assert!(!nodes.is_empty());

        let mut bases = Vec::with_capacity(nodes.len());
        let mut interp = Poly::constant(0.0);

        for (k, &xk) in nodes.iter().enumerate() {
            let mut basis = Poly::constant(1.0);
            for (j, &xj) in nodes.iter().enumerate() {
                if j == k {
                    continue;
                }
                let denom = xk - xj;
                debug_assert!(denom != 0.0, "interpolation nodes must be distinct");
                basis = basis.mul(&Poly::new(vec![-xj / denom, 1.0 / denom]));
            }
            interp = interp.add(&basis.scale(values[k]));
            bases.push(basis);
        }

        (interp, bases)
    }
}

#[cfg(test)]
mod tests {
    use super::Poly;

    #[test]
    fn eval_horner() {
        // 1 + 2x + 3x^2
        let p = Poly::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.eval(0.0), 1.0);
        assert_eq!(p.eval(2.0), 17.0);
    }

    #[test]
    fn mul_and_add() {
        // (1 + x)(1 - x) = 1 - x^2
        let a = Poly::new(vec![1.0, 1.0]);
        let b = Poly::new(vec![1.0, -1.0]);
        assert_eq!(a.mul(&b), Poly::new(vec![1.0, 0.0, -1.0]));
        assert_eq!(a.add(&b), Poly::new(vec![2.0, 0.0]));
    }

    #[test]
    fn lagrange_reproduces_cubic() {
        // f(x) = 2 - x + 0.5 x^2 + 0.25 x^3
        let f = Poly::new(vec![2.0, -1.0, 0.5, 0.25]);
        let nodes = [-1.0, -0.4472135954999579, 0.4472135954999579, 1.0];
        let values: Vec<f64> = nodes.iter().map(|&x| f.eval(x)).collect();

        let (fit, _) = Poly::lagrange_fit(&nodes, &values);
        for (c_fit, c_true) in fit.coeffs().iter().zip(f.coeffs()) {
            assert!((c_fit - c_true).abs() < 1e-10);
        }
    }

    #[test]
    fn lagrange_basis_property() {
        let nodes = [0.0, 1.0, 2.5, 4.0];
        let values = [3.0, -1.0, 0.0, 7.0];
        let (_, bases) = Poly::lagrange_fit(&nodes, &values);

        for (k, basis) in bases.iter().enumerate() {
            for (j, &xj) in nodes.iter().enumerate() {
                let expected = if j == k { 1.0 } else { 0.0 };
                assert!((basis.eval(xj) - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn lagrange_exact_at_nodes() {
        let nodes = [0.1, 1.7, 3.2, 5.0];
        let values = [10.0, 14.2, 30.9, 55.5];
        let (fit, _) = Poly::lagrange_fit(&nodes, &values);
        for (&x, &y) in nodes.iter().zip(values.iter()) {
            assert!((fit.eval(x) - y).abs() < 1e-6);
        }
    }
}
