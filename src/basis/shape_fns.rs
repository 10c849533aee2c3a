/// A Hierarchical (p-version) Shape Function defined over the reference interval [-1.0, +1.0]
///
/// For a polynomial order `p`, the basis consists of `p + 1` functions:
/// * functions 0 and 1 are the corner functions `(1 - r) / 2` and `(1 + r) / 2`, which satisfy the
///   standard nodal property at the interval's endpoints
/// * functions `2..=p` are interior integrated-Legendre modes which vanish at both endpoints,
///   allowing the expansion order to change without renumbering corner degrees of freedom
///
/// Normalization factors for the interior modes are computed once at construction; evaluation
/// itself takes `&self` and performs no mutation, so a single evaluator can be shared by every
/// element of the same order.
#[derive(Clone, Debug)]
pub struct HierarchicalShapeFn {
    order: usize,
    value_norms: Vec<f64>,
    deriv_norms: Vec<f64>,
}

impl HierarchicalShapeFn {
    pub(crate) fn with(order: usize) -> Self {
        debug_assert!(order >= 1);
        let value_norms = (2..=order)
            .map(|k| 1.0 / (2.0 * (2.0 * (k as f64) - 1.0)).sqrt())
            .collect();
        let deriv_norms = (2..=order)
            .map(|k| ((2.0 * (k as f64) - 1.0) / 2.0).sqrt())
            .collect();

        Self {
            order,
            value_norms,
            deriv_norms,
        }
    }

    /// Polynomial order of this basis
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of functions in this basis (`order + 1`)
    pub fn num_fns(&self) -> usize {
        self.order + 1
    }

    /// Evaluate all `order + 1` shape functions at a reference coordinate
    ///
    /// Function 0 is 1 at `r = -1` and 0 at `r = +1` (and vice versa for function 1); functions
    /// `2..=order` vanish at both endpoints.
    pub fn values(&self, r: f64) -> Vec<f64> {
        let mut n = Vec::with_capacity(self.num_fns());
        n.push(0.5 * (1.0 - r));
        n.push(0.5 * (1.0 + r));

        if self.order > 1 {
            let leg = legendre_table(self.order, r);
            for k in 2..=self.order {
                n.push((leg[k] - leg[k - 2]) * self.value_norms[k - 2]);
            }
        }

        n
    }

    /// Evaluate the first derivatives of all `order + 1` shape functions with respect to the
    /// reference coordinate
    ///
    /// Derivatives are taken in reference space; scaling to physical space is the caller's
    /// responsibility via the element's Jacobian.
    pub fn derivs(&self, r: f64) -> Vec<f64> {
        let mut dn = Vec::with_capacity(self.num_fns());
        dn.push(-0.5);
        dn.push(0.5);

        if self.order > 1 {
            let leg = legendre_table(self.order - 1, r);
            for k in 2..=self.order {
                dn.push(leg[k - 1] * self.deriv_norms[k - 2]);
            }
        }

        dn
    }
}

// Legendre Polynomials P_0 through P_n at a single point via the three-term recurrence
fn legendre_table(n_max: usize, r: f64) -> Vec<f64> {
    let mut p = Vec::with_capacity(n_max + 1);
    for n in 0..=n_max {
        let n_ = n as f64;
        match n {
            0 => p.push(1.0),
            1 => p.push(r),
            _ => p.push(((2.0 * n_ - 1.0) * r * p[n - 1] - (n_ - 1.0) * p[n - 2]) / n_),
        }
    }
    p
}
