use crate::model::Model;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::fmt;

/// Default absolute tolerance for destination points at or minutely outside the extreme source
/// mesh ends. Points further out than this fail [MeshMapper] construction.
pub const DEFAULT_BOUNDS_TOL: f64 = 100.0 * f64::EPSILON;

/// Transports field values and derivatives from a source [Model] onto an arbitrary destination
/// mesh
///
/// Construction locates, once, the containing source element and local reference coordinate of
/// every destination point (failing on points outside the source mesh bounds); the interpolation
/// calls can then be repeated against any number of source DOF matrices without re-searching.
/// A typical use samples an FE state vector at the coupling points of an auxiliary ODE system
/// once per time-integrator evaluation.
pub struct MeshMapper<'m> {
    model: &'m Model,
    dest_mesh: Vec<f64>,
    dest_param_vals: Vec<f64>,
    dest_elem_indices: Vec<usize>,
    src_dof_indices: Vec<usize>,
}

impl<'m> MeshMapper<'m> {
    /// Build a mapper from the model's mesh onto `dest_mesh` using [DEFAULT_BOUNDS_TOL]
    ///
    /// `dest_mesh` need not align with the source nodes, or be a mesh in any structural sense;
    /// any finite coordinate sequence within the source bounds is valid.
    ///
    /// # Returns
    /// * An `Err` if any destination point lies outside the source mesh bounds beyond tolerance;
    ///   no partially-built mapper is returned
    pub fn new(model: &'m Model, dest_mesh: &[f64]) -> Result<Self, MapperError> {
        Self::with_tolerance(model, dest_mesh, DEFAULT_BOUNDS_TOL)
    }

    /// Build a mapper with a caller-supplied bounds tolerance
    ///
    /// Widening the tolerance only changes which slightly-out-of-bounds points are accepted and
    /// clamped to the extreme elements; it does not affect interior point location.
    pub fn with_tolerance(
        model: &'m Model,
        dest_mesh: &[f64],
        tol: f64,
    ) -> Result<Self, MapperError> {
        let src = model.mesh();
        let num_src = src.num_nodes();
        let num_dest = dest_mesh.len();

        let mut dest_param_vals = Vec::with_capacity(num_dest);
        let mut dest_elem_indices = Vec::with_capacity(num_dest);
        let mut src_dof_indices = Vec::new();

        for &xd in dest_mesh {
            // index of the first source node strictly greater than xd; points coincident with a
            // node land in the element to that node's right, except at the last node
            let ind = src.coords().partition_point(|&x| x <= xd);

            let ind_right = if ind == 0 {
                if src.min() - xd > tol {
                    return Err(MapperError::PointBelowMesh {
                        point: xd,
                        mesh_min: src.min(),
                    });
                }
                1
            } else if ind == num_src {
                if xd - src.max() > tol {
                    return Err(MapperError::PointAboveMesh {
                        point: xd,
                        mesh_max: src.max(),
                    });
                }
                num_src - 1
            } else {
                ind
            };

            let (x_left, x_right) = (src[ind_right - 1], src[ind_right]);
            let elem_idx = ind_right - 1;

            dest_param_vals.push(2.0 * (xd - x_left) / (x_right - x_left) - 1.0);
            dest_elem_indices.push(elem_idx);
            src_dof_indices.extend(model.dof_indices_for_elem(elem_idx));
        }

        src_dof_indices.sort_unstable();
        src_dof_indices.dedup();

        Ok(Self {
            model,
            dest_mesh: dest_mesh.to_vec(),
            dest_param_vals,
            dest_elem_indices,
            src_dof_indices,
        })
    }

    /// Interpolate source DOF values onto the destination points
    ///
    /// `src` has one row per dependent variable and one column per FE node of the source model.
    /// The result has the same row count and one column per destination point. The source matrix
    /// is not modified.
    ///
    /// # Returns
    /// * An `Err` if `src` does not have one column per source FE node
    pub fn map_values(&self, src: &DMatrix<f64>) -> Result<DMatrix<f64>, MapperError> {
        self.map_impl(src, false)
    }

    /// Interpolate the spatial derivatives of source DOF values onto the destination points
    ///
    /// Derivatives are taken with respect to the physical coordinate: each point's reference
    /// space derivative is scaled by its element's Jacobian factor `2 / (x_right - x_left)`.
    pub fn map_derivatives(&self, src: &DMatrix<f64>) -> Result<DMatrix<f64>, MapperError> {
        self.map_impl(src, true)
    }

    /// [MeshMapper::map_values] with the destination points evaluated in parallel
    pub fn map_values_par(&self, src: &DMatrix<f64>) -> Result<DMatrix<f64>, MapperError> {
        self.par_map_impl(src, false)
    }

    /// [MeshMapper::map_derivatives] with the destination points evaluated in parallel
    pub fn map_derivatives_par(&self, src: &DMatrix<f64>) -> Result<DMatrix<f64>, MapperError> {
        self.par_map_impl(src, true)
    }

    fn map_impl(&self, src: &DMatrix<f64>, calc_deriv: bool) -> Result<DMatrix<f64>, MapperError> {
        self.check_src_extent(src)?;

        let mut dest = DMatrix::zeros(src.nrows(), self.dest_mesh.len());
        for i in 0..self.dest_mesh.len() {
            dest.set_column(i, &self.interpolate_point(i, src, calc_deriv));
        }
        Ok(dest)
    }

    fn par_map_impl(
        &self,
        src: &DMatrix<f64>,
        calc_deriv: bool,
    ) -> Result<DMatrix<f64>, MapperError> {
        self.check_src_extent(src)?;

        if self.dest_mesh.is_empty() {
            return Ok(DMatrix::zeros(src.nrows(), 0));
        }

        let columns: Vec<DVector<f64>> = (0..self.dest_mesh.len())
            .into_par_iter()
            .map(|i| self.interpolate_point(i, src, calc_deriv))
            .collect();
        Ok(DMatrix::from_columns(&columns))
    }

    // weighted sum of the owning element's DOF columns; infallible once construction succeeds
    fn interpolate_point(&self, point_idx: usize, src: &DMatrix<f64>, calc_deriv: bool) -> DVector<f64> {
        let r = self.dest_param_vals[point_idx];
        let elem_idx = self.dest_elem_indices[point_idx];
        let shape_fn = self.model.element(elem_idx).shape_fn();
        let dofs = self.model.dof_indices_for_elem(elem_idx);

        let n = if calc_deriv {
            shape_fn.derivs(r)
        } else {
            shape_fn.values(r)
        };

        let mut col = DVector::zeros(src.nrows());
        for (j, &dof) in dofs.iter().enumerate() {
            col.axpy(n[j], &src.column(dof), 1.0);
        }

        if calc_deriv {
            let (x_left, x_right) = self.model.mesh().span_of(elem_idx);
            col *= 2.0 / (x_right - x_left);
        }

        col
    }

    fn check_src_extent(&self, src: &DMatrix<f64>) -> Result<(), MapperError> {
        if src.ncols() != self.model.num_fe_nodes() {
            Err(MapperError::MismatchedDofCount(
                self.model.num_fe_nodes(),
                src.ncols(),
            ))
        } else {
            Ok(())
        }
    }

    /// The destination coordinate sequence this mapper was built for
    pub fn dest_mesh(&self) -> &[f64] {
        &self.dest_mesh
    }

    /// Index of the source element containing destination point `point_idx`
    pub fn elem_index_of(&self, point_idx: usize) -> usize {
        self.dest_elem_indices[point_idx]
    }

    /// Local reference coordinate of destination point `point_idx` within its element
    pub fn local_coord_of(&self, point_idx: usize) -> f64 {
        self.dest_param_vals[point_idx]
    }

    /// Sorted, deduplicated global indices of every source DOF which influences the destination
    /// points (e.g. for sparsity or dependency tracking by the caller)
    pub fn source_dof_indices(&self) -> &[usize] {
        &self.src_dof_indices
    }
}

/// The Error Type for invalid mappings and mismatched source data
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    PointBelowMesh { point: f64, mesh_min: f64 },
    PointAboveMesh { point: f64, mesh_max: f64 },
    MismatchedDofCount(usize, usize),
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PointBelowMesh { point, mesh_min } => write!(
                f,
                "Coupling point at {:12.3e} is less than the left-most mesh point at {:12.3e}; Cannot construct MeshMapper!",
                point, mesh_min
            ),
            Self::PointAboveMesh { point, mesh_max } => write!(
                f,
                "Coupling point at {:12.3e} is greater than the right-most mesh point at {:12.3e}; Cannot construct MeshMapper!",
                point, mesh_max
            ),
            Self::MismatchedDofCount(expected, found) => write!(
                f,
                "Source model has {} FE nodes but the DOF matrix has {} columns; Cannot interpolate!",
                expected, found
            ),
        }
    }
}

impl std::error::Error for MapperError {}
