/// The 1D Node Mesh over which a Model is discretized
pub mod mesh;

use crate::basis::{shape_fns::HierarchicalShapeFn, ShapeFnError, ShapeFnManager};
use mesh::Mesh;
use nalgebra::DMatrix;
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::sync::Arc;

/// The global DOF indices owned by a single element, in local order
pub type DofList = SmallVec<[usize; 8]>;

/// The span between two consecutive mesh nodes; the unit of shape function support
///
/// Elements of the same polynomial order share a single [HierarchicalShapeFn] evaluator.
pub struct Element {
    nodes: [usize; 2],
    shape_fn: Arc<HierarchicalShapeFn>,
}

impl Element {
    fn new(left_node: usize, right_node: usize, shape_fn: Arc<HierarchicalShapeFn>) -> Self {
        Self {
            nodes: [left_node, right_node],
            shape_fn,
        }
    }

    /// Mesh-node indices of this element's endpoints
    pub fn nodes(&self) -> [usize; 2] {
        self.nodes
    }

    /// The shared shape function evaluator bound to this element
    pub fn shape_fn(&self) -> &HierarchicalShapeFn {
        &self.shape_fn
    }

    /// Local hierarchical node count (`order + 1`)
    pub fn num_nodes(&self) -> usize {
        self.shape_fn.num_fns()
    }
}

/// The spatial discretization of a 1D Model: its mesh, elements and global DOF numbering
///
/// Corner DOFs are shared between adjacent elements (element i's last corner DOF is element
/// i+1's first); interior hierarchical DOFs are private to one element. The Model is a pure
/// query object once constructed.
pub struct Model {
    mesh: Mesh,
    poly_order: usize,
    num_dofs_per_node: usize,
    elements: Vec<Element>,
    elem_dof_offsets: Vec<usize>,
    num_fe_nodes: usize,
}

impl Model {
    /// Discretize a [Mesh] into elements of uniform polynomial order
    ///
    /// Each element is bound to the cached evaluator for `poly_order`. `num_dofs_per_node` is
    /// the number of dependent variables carried at each hierarchical node.
    ///
    /// # Returns
    /// * An `Err` if `poly_order` is outside the supported range
    ///
    /// # Example
    /// ```
    /// use fem_1d::prelude::*;
    ///
    /// let mesh = Mesh::from_coords(vec![0.0, 1.0, 2.0]).unwrap();
    /// let mut sf_manager = ShapeFnManager::new();
    /// let model = Model::from_mesh(mesh, 3, 1, &mut sf_manager).unwrap();
    ///
    /// // 3 mesh nodes plus 2 private interior nodes on each of the 2 elements
    /// assert_eq!(model.num_fe_nodes(), 7);
    /// assert_eq!(model.num_eqns(), 7);
    /// ```
    pub fn from_mesh(
        mesh: Mesh,
        poly_order: usize,
        num_dofs_per_node: usize,
        sf_manager: &mut ShapeFnManager,
    ) -> Result<Self, ShapeFnError> {
        let shape_fn = sf_manager.get(poly_order)?;

        let num_elems = mesh.num_elems();
        let mut elements = Vec::with_capacity(num_elems);
        let mut elem_dof_offsets = Vec::with_capacity(num_elems);

        let mut dof = 0;
        for i in 0..num_elems {
            elements.push(Element::new(i, i + 1, shape_fn.clone()));
            elem_dof_offsets.push(dof);
            dof += poly_order;
        }

        Ok(Self {
            mesh,
            poly_order,
            num_dofs_per_node,
            elements,
            elem_dof_offsets,
            num_fe_nodes: dof + 1,
        })
    }

    /// The node mesh this Model was built from
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn element(&self, elem_idx: usize) -> &Element {
        &self.elements[elem_idx]
    }

    pub fn num_elems(&self) -> usize {
        self.elements.len()
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    /// Number of dependent variables carried at each hierarchical node
    pub fn num_dofs_per_node(&self) -> usize {
        self.num_dofs_per_node
    }

    /// Total hierarchical node count: mesh nodes plus private interior nodes
    pub fn num_fe_nodes(&self) -> usize {
        self.num_fe_nodes
    }

    /// Total number of scalar unknowns (`num_dofs_per_node * num_fe_nodes`)
    pub fn num_eqns(&self) -> usize {
        self.num_dofs_per_node * self.num_fe_nodes
    }

    /// The global DOF indices owned by element `elem_idx`, in local order
    ///
    /// Local order matches the shape function ordering: both endpoints first, then the interior
    /// hierarchical DOFs in ascending order. For an element with offset `d` and `nn` local
    /// nodes, this is `[d, d + nn - 1, d + 1, d + 2, ...]`.
    ///
    /// # Example
    /// ```
    /// use fem_1d::prelude::*;
    ///
    /// let mesh = Mesh::from_coords(vec![0.0, 1.0, 2.0]).unwrap();
    /// let mut sf_manager = ShapeFnManager::new();
    /// let model = Model::from_mesh(mesh, 3, 1, &mut sf_manager).unwrap();
    ///
    /// assert_eq!(model.dof_indices_for_elem(0).as_slice(), &[0, 3, 1, 2]);
    /// assert_eq!(model.dof_indices_for_elem(1).as_slice(), &[3, 6, 4, 5]);
    /// ```
    pub fn dof_indices_for_elem(&self, elem_idx: usize) -> DofList {
        let nn = self.elements[elem_idx].num_nodes();
        let d = self.elem_dof_offsets[elem_idx];

        let mut dofs: DofList = smallvec![d, d + nn - 1];
        dofs.extend((1..nn - 1).map(|i| d + i));
        dofs
    }

    /// Gather the columns named by `dofs` from a global value matrix into a per-element matrix
    ///
    /// The row count (dependent variable count) is preserved and the column order is given by
    /// `dofs`. The global matrix is not modified.
    ///
    /// # Returns
    /// * An `Err` if the global matrix does not have one column per FE node
    pub fn global_to_elem_vec(
        &self,
        dofs: &DofList,
        global: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, ModelError> {
        if global.ncols() != self.num_fe_nodes {
            Err(ModelError::MismatchedDofCount(
                self.num_fe_nodes,
                global.ncols(),
            ))
        } else {
            Ok(global.select_columns(dofs.iter()))
        }
    }

    /// Extract the corner-DOF column for every mesh node from a global value matrix
    ///
    /// Mesh node `i` corresponds to FE node `i * poly_order`; interior hierarchical columns are
    /// skipped. Used to report a solution directly on the mesh nodes.
    pub fn global_to_mesh_vec(&self, global: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        if global.ncols() != self.num_fe_nodes {
            Err(ModelError::MismatchedDofCount(
                self.num_fe_nodes,
                global.ncols(),
            ))
        } else {
            let corner_cols: Vec<usize> = (0..self.mesh.num_nodes())
                .map(|i| i * self.poly_order)
                .collect();
            Ok(global.select_columns(corner_cols.iter()))
        }
    }
}

/// The Error Type for dimension mismatches between a Model and caller-supplied data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    MismatchedDofCount(usize, usize),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MismatchedDofCount(expected, found) => write!(
                f,
                "Model has {} FE nodes but the global matrix has {} columns; Cannot gather element values!",
                expected, found
            ),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_node_model(poly_order: usize, num_dofs_per_node: usize) -> Model {
        let mesh = Mesh::from_coords(vec![0.0, 1.0, 2.0]).unwrap();
        let mut sfm = ShapeFnManager::new();
        Model::from_mesh(mesh, poly_order, num_dofs_per_node, &mut sfm).unwrap()
    }

    #[test]
    fn linear_dof_numbering() {
        let model = three_node_model(1, 1);
        assert_eq!(model.num_elems(), 2);
        assert_eq!(model.num_fe_nodes(), 3);
        assert_eq!(model.num_eqns(), 3);
        assert_eq!(model.element(1).nodes(), [1, 2]);
        assert_eq!(model.element(1).num_nodes(), 2);
        assert_eq!(model.dof_indices_for_elem(0).as_slice(), &[0, 1]);
        assert_eq!(model.dof_indices_for_elem(1).as_slice(), &[1, 2]);
    }

    #[test]
    fn cubic_dof_numbering() {
        // endpoints first, interior ascending; corner DOFs shared between adjacent elements
        let model = three_node_model(3, 1);
        assert_eq!(model.num_fe_nodes(), 7);
        assert_eq!(model.dof_indices_for_elem(0).as_slice(), &[0, 3, 1, 2]);
        assert_eq!(model.dof_indices_for_elem(1).as_slice(), &[3, 6, 4, 5]);
    }

    #[test]
    fn shared_corner_dofs() {
        let model = three_node_model(4, 2);
        let left = model.dof_indices_for_elem(0);
        let right = model.dof_indices_for_elem(1);
        assert_eq!(left[1], right[0]);
        assert_eq!(model.num_eqns(), 2 * model.num_fe_nodes());
    }

    #[test]
    fn elements_share_one_evaluator() {
        let model = three_node_model(5, 1);
        let sf_a = model.element(0).shape_fn() as *const HierarchicalShapeFn;
        let sf_b = model.element(1).shape_fn() as *const HierarchicalShapeFn;
        assert_eq!(sf_a, sf_b);
    }

    #[test]
    fn elem_gather_preserves_order() {
        let model = three_node_model(3, 2);
        let global = DMatrix::from_fn(2, model.num_fe_nodes(), |r, c| (10 * r + c) as f64);

        let dofs = model.dof_indices_for_elem(1);
        let elem_vals = model.global_to_elem_vec(&dofs, &global).unwrap();

        assert_eq!(elem_vals.nrows(), 2);
        assert_eq!(elem_vals.ncols(), 4);
        // columns 3, 6, 4, 5 of the global matrix, in that order
        assert_eq!(elem_vals[(0, 0)], 3.0);
        assert_eq!(elem_vals[(0, 1)], 6.0);
        assert_eq!(elem_vals[(0, 2)], 4.0);
        assert_eq!(elem_vals[(0, 3)], 5.0);
        assert_eq!(elem_vals[(1, 0)], 13.0);
    }

    #[test]
    fn mesh_gather_skips_interior_columns() {
        let model = three_node_model(3, 1);
        let global = DMatrix::from_fn(1, model.num_fe_nodes(), |_, c| c as f64);

        let mesh_vals = model.global_to_mesh_vec(&global).unwrap();
        assert_eq!(mesh_vals.ncols(), 3);
        assert_eq!(mesh_vals[(0, 0)], 0.0);
        assert_eq!(mesh_vals[(0, 1)], 3.0);
        assert_eq!(mesh_vals[(0, 2)], 6.0);
    }

    #[test]
    fn gather_rejects_mismatched_extents() {
        let model = three_node_model(2, 1);
        let wrong = DMatrix::zeros(1, model.num_fe_nodes() + 2);
        let dofs = model.dof_indices_for_elem(0);
        assert_eq!(
            model.global_to_elem_vec(&dofs, &wrong),
            Err(ModelError::MismatchedDofCount(
                model.num_fe_nodes(),
                model.num_fe_nodes() + 2
            ))
        );
    }
}
