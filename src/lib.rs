//! A 1D Finite Element Method Toolkit
//!
//! This library discretizes one-dimensional time-dependent PDE (or coupled PDE/ODE) systems on
//! a node mesh with hierarchical (p-version) shape functions, and transports field values and
//! derivatives between unrelated meshes:
//!
//! * [basis]: Hierarchical Shape Function evaluation and the per-order evaluator cache
//! * [model]: Element partitioning and global DOF numbering over a node [Mesh](model::mesh::Mesh)
//! * [mapper]: Precomputed value/derivative interpolation onto arbitrary destination meshes
//!   (e.g. the coupling points of an auxiliary ODE system)
//! * [solution]: Per-time-step recording of a global solution vector onto a view mesh
//!
//! Time integration, equation assembly and boundary condition handling are left to external
//! collaborators; every structure here is a pure query object once constructed.
//!
//! ```
//! use fem_1d::prelude::*;
//!
//! // discretize [0, 2] with two cubic elements, one dependent variable
//! let mesh = Mesh::from_coords(vec![0.0, 1.0, 2.0]).unwrap();
//! let mut sf_manager = ShapeFnManager::new();
//! let model = Model::from_mesh(mesh, 3, 1, &mut sf_manager).unwrap();
//!
//! // sample the FE state at two ODE coupling points, many times per solve
//! let mapper = MeshMapper::new(&model, &[0.25, 1.75]).unwrap();
//! assert_eq!(mapper.elem_index_of(1), 1);
//! ```

/// Evaluation of the Hierarchical Shape Functions and the per-order evaluator cache
pub mod basis;
/// Precomputed mesh-to-mesh value and derivative interpolation
pub mod mapper;
/// The spatial discretization of a 1D Model: mesh, elements and DOF numbering
pub mod model;
/// Time-indexed recording of solution vectors on a view mesh
pub mod solution;

/// Convenient import of the toolkit's main structures
pub mod prelude {
    pub use crate::basis::{ShapeFnError, ShapeFnManager, MAX_POLYNOMIAL_ORDER};
    pub use crate::mapper::{MapperError, MeshMapper, DEFAULT_BOUNDS_TOL};
    pub use crate::model::mesh::{Mesh, MeshError};
    pub use crate::model::{DofList, Element, Model, ModelError};
    pub use crate::solution::{Solution, SolutionError};
}
