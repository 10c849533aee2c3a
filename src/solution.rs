use crate::model::Model;
use nalgebra::{DMatrix, DVector, RowDVector};
use std::fmt;

#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::{BufWriter, Write};

/// A time history of the discrete solution, remapped onto an independent view mesh for reporting
///
/// The view mesh is either the model's mesh itself (`view_elems_per_elem = 1`) or a uniform
/// subdivision of every element (`view_elems_per_elem = N` splits each element into N equal
/// sub-intervals), which renders higher-order elements smoothly. The table holds one row per
/// recorded time step and is append-only; rows are never rewritten.
pub struct Solution<'m> {
    model: &'m Model,
    x: Vec<f64>,
    time_span: Vec<f64>,
    recorded_times: Vec<f64>,
    view_elems_per_elem: usize,
    // basis values at the interior view points, shared by every element (None for density 1)
    interior_basis: Option<DMatrix<f64>>,
    u: DMatrix<f64>,
}

impl<'m> Solution<'m> {
    /// Build an empty Solution table over a [Model]
    ///
    /// The table is sized from `time_span` up front; `view_elems_per_elem` sets the output
    /// density. The view coordinate sequence is constructed once here: shared element endpoints
    /// appear exactly once each.
    ///
    /// # Returns
    /// * An `Err` if `view_elems_per_elem` is 0
    pub fn new(
        model: &'m Model,
        time_span: &[f64],
        view_elems_per_elem: usize,
    ) -> Result<Self, SolutionError> {
        if view_elems_per_elem == 0 {
            return Err(SolutionError::NoViewElems);
        }

        let mesh = model.mesh();
        let (x, interior_basis) = if view_elems_per_elem == 1 {
            (mesh.coords().to_vec(), None)
        } else {
            let num_r = view_elems_per_elem - 1;
            let mut x = Vec::with_capacity(mesh.num_elems() * view_elems_per_elem + 1);
            x.push(mesh.min());
            for elem_idx in 0..mesh.num_elems() {
                let (x_left, x_right) = mesh.span_of(elem_idx);
                let dx = (x_right - x_left) / (view_elems_per_elem as f64);
                for j in 1..=num_r {
                    x.push(x_left + dx * (j as f64));
                }
                x.push(x_right);
            }

            // evaluate the basis at the interior reference positions once; every element shares
            // the same expansion order, so one table serves the whole mesh
            let shape_fn = model.element(0).shape_fn();
            let dr = 2.0 / (view_elems_per_elem as f64);
            let mut n_mat = DMatrix::zeros(shape_fn.num_fns(), num_r);
            for j in 0..num_r {
                let r = -1.0 + dr * ((j + 1) as f64);
                n_mat.set_column(j, &DVector::from_vec(shape_fn.values(r)));
            }

            (x, Some(n_mat))
        };

        let num_view_nodes = x.len();
        Ok(Self {
            model,
            x,
            time_span: time_span.to_vec(),
            recorded_times: Vec::with_capacity(time_span.len()),
            view_elems_per_elem,
            interior_basis,
            u: DMatrix::zeros(time_span.len(), num_view_nodes * model.num_dofs_per_node()),
        })
    }

    /// Convert a raw global solution vector into per-view-point values and store it as the row
    /// for `step`
    ///
    /// `u_sol` is the flat global state vector: the dependent variables of FE node 0, then FE
    /// node 1, and so on (`num_dofs_per_node * num_fe_nodes` entries). Steps must be recorded
    /// contiguously from 0; prior rows are never modified.
    ///
    /// # Returns
    /// * An `Err` if `u_sol` has the wrong extent for the model
    /// * An `Err` if `step` is outside the time span or out of order
    pub fn record_time_step(
        &mut self,
        step: usize,
        time: f64,
        u_sol: &[f64],
    ) -> Result<(), SolutionError> {
        if u_sol.len() != self.model.num_eqns() {
            return Err(SolutionError::MismatchedSolutionSize(
                self.model.num_eqns(),
                u_sol.len(),
            ));
        }
        if step >= self.time_span.len() {
            return Err(SolutionError::StepOutOfRange(step, self.time_span.len()));
        }
        if step != self.recorded_times.len() {
            return Err(SolutionError::NonContiguousStep(
                self.recorded_times.len(),
                step,
            ));
        }

        let num_dep_vars = self.model.num_dofs_per_node();
        let u_global = DMatrix::from_column_slice(num_dep_vars, self.model.num_fe_nodes(), u_sol);

        // dimensions are validated above; the gathers below cannot fail
        let u_view = match &self.interior_basis {
            None => self.model.global_to_mesh_vec(&u_global).unwrap(),
            Some(n_mat) => {
                let num_r = self.view_elems_per_elem - 1;
                let mut u_view = DMatrix::zeros(num_dep_vars, self.x.len());

                let mut i_view = 0;
                let mut u_elem = DMatrix::zeros(num_dep_vars, 0);
                for elem_idx in 0..self.model.num_elems() {
                    let dofs = self.model.dof_indices_for_elem(elem_idx);
                    u_elem = self.model.global_to_elem_vec(&dofs, &u_global).unwrap();

                    // left endpoint once, then the interpolated interior points; the right
                    // endpoint is the next element's left endpoint (or the final view node)
                    u_view.set_column(i_view, &u_elem.column(0));
                    u_view
                        .columns_mut(i_view + 1, num_r)
                        .copy_from(&(&u_elem * n_mat));
                    i_view += num_r + 1;
                }
                u_view.set_column(i_view, &u_elem.column(1));

                u_view
            }
        };

        self.u
            .set_row(step, &RowDVector::from_row_slice(u_view.as_slice()));
        self.recorded_times.push(time);
        Ok(())
    }

    /// The view coordinate sequence values are reported on
    pub fn output_mesh(&self) -> &[f64] {
        &self.x
    }

    /// The time span the table was sized for
    pub fn time_span(&self) -> &[f64] {
        &self.time_span
    }

    /// The times recorded so far, in step order
    pub fn times(&self) -> &[f64] {
        &self.recorded_times
    }

    pub fn num_recorded(&self) -> usize {
        self.recorded_times.len()
    }

    /// The raw solution table: one row per time step, one column per (view point, dependent
    /// variable) pair in view-point-major order
    pub fn table(&self) -> &DMatrix<f64> {
        &self.u
    }

    /// The recorded values for one time step, reshaped to one row per dependent variable and
    /// one column per view point
    ///
    /// # Returns
    /// * An `Err` if `step` has not been recorded yet
    pub fn values_at(&self, step: usize) -> Result<DMatrix<f64>, SolutionError> {
        if step >= self.recorded_times.len() {
            Err(SolutionError::StepOutOfRange(
                step,
                self.recorded_times.len(),
            ))
        } else {
            let row: Vec<f64> = self.u.row(step).iter().cloned().collect();
            Ok(DMatrix::from_column_slice(
                self.model.num_dofs_per_node(),
                self.x.len(),
                &row,
            ))
        }
    }

    /// Write the view mesh, recorded times and solution table to a JSON file
    ///
    /// solution.json
    /// ```JSON
    /// {
    ///     "x": [0.0, 0.5, 1.0],
    ///     "t": [0.0, 0.1],
    ///     "u": [[1.0, 1.0, 1.0], [0.9, 0.8, 0.9]]
    /// }
    /// ```
    #[cfg(feature = "json_export")]
    pub fn print_to_json(&self, path: impl AsRef<str>) -> std::io::Result<()> {
        let mut data = json::JsonValue::new_object();
        data["x"] = self.x.clone().into();
        data["t"] = self.recorded_times.clone().into();
        data["u"] = json::JsonValue::Array(
            (0..self.recorded_times.len())
                .map(|step| {
                    let row: Vec<f64> = self.u.row(step).iter().cloned().collect();
                    json::JsonValue::from(row)
                })
                .collect(),
        );

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        data.write(&mut writer)?;
        writer.flush()
    }
}

/// The Error Type for invalid Solution recording requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionError {
    MismatchedSolutionSize(usize, usize),
    StepOutOfRange(usize, usize),
    NonContiguousStep(usize, usize),
    NoViewElems,
}

impl fmt::Display for SolutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MismatchedSolutionSize(expected, found) => write!(
                f,
                "Model has {} equations but the solution vector has {} entries; Cannot record time step!",
                expected, found
            ),
            Self::StepOutOfRange(step, num_steps) => write!(
                f,
                "Time step {} is outside the {} available steps; Cannot access Solution row!",
                step, num_steps
            ),
            Self::NonContiguousStep(expected, found) => write!(
                f,
                "Expected time step {} but {} was recorded; Steps must be contiguous!",
                expected, found
            ),
            Self::NoViewElems => write!(
                f,
                "At least 1 view element per mesh element is required; Cannot construct Solution!"
            ),
        }
    }
}

impl std::error::Error for SolutionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::ShapeFnManager;
    use crate::model::mesh::Mesh;

    const ACCURACY: f64 = 1e-12;

    fn model(coords: Vec<f64>, poly_order: usize, num_dep_vars: usize) -> Model {
        let mesh = Mesh::from_coords(coords).unwrap();
        let mut sfm = ShapeFnManager::new();
        Model::from_mesh(mesh, poly_order, num_dep_vars, &mut sfm).unwrap()
    }

    #[test]
    fn density_two_view_mesh() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 1);
        let solution = Solution::new(&model, &[0.0, 1.0], 2).unwrap();

        // shared element endpoints appear exactly once
        let expected = [0.0, 0.5, 1.0, 1.5, 2.0];
        assert_eq!(solution.output_mesh().len(), expected.len());
        for (x, x_exp) in solution.output_mesh().iter().zip(expected.iter()) {
            assert!((x - x_exp).abs() < ACCURACY);
        }
    }

    #[test]
    fn density_one_records_mesh_values() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 1);
        let mut solution = Solution::new(&model, &[0.0, 0.5], 1).unwrap();

        assert_eq!(solution.time_span(), &[0.0, 0.5]);
        assert_eq!(solution.output_mesh(), model.mesh().coords());

        solution.record_time_step(0, 0.0, &[10.0, 20.0, 30.0]).unwrap();
        solution.record_time_step(1, 0.5, &[11.0, 21.0, 31.0]).unwrap();

        assert_eq!(solution.num_recorded(), 2);
        assert_eq!(solution.times(), &[0.0, 0.5]);
        assert_eq!(solution.table().nrows(), 2);
        assert_eq!(solution.table().ncols(), 3);

        let step_1 = solution.values_at(1).unwrap();
        assert_eq!(step_1[(0, 0)], 11.0);
        assert_eq!(step_1[(0, 1)], 21.0);
        assert_eq!(step_1[(0, 2)], 31.0);
    }

    #[test]
    fn density_one_skips_interior_dofs() {
        let model = model(vec![0.0, 1.0, 2.0], 3, 1);
        let mut solution = Solution::new(&model, &[0.0], 1).unwrap();

        let u_sol: Vec<f64> = (0..model.num_eqns()).map(|i| i as f64).collect();
        solution.record_time_step(0, 0.0, &u_sol).unwrap();

        // mesh nodes live at FE nodes 0, 3 and 6
        let step_0 = solution.values_at(0).unwrap();
        assert_eq!(step_0.ncols(), 3);
        assert_eq!(step_0[(0, 0)], 0.0);
        assert_eq!(step_0[(0, 1)], 3.0);
        assert_eq!(step_0[(0, 2)], 6.0);
    }

    #[test]
    fn density_one_regroups_dependent_variables() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 2);
        let mut solution = Solution::new(&model, &[0.0], 1).unwrap();

        // both dependent variables of each node are adjacent in the flat vector
        let u_sol = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        solution.record_time_step(0, 0.0, &u_sol).unwrap();

        let step_0 = solution.values_at(0).unwrap();
        assert_eq!(step_0.nrows(), 2);
        for node in 0..3 {
            assert_eq!(step_0[(0, node)], (node + 1) as f64);
            assert_eq!(step_0[(1, node)], -((node + 1) as f64));
        }
    }

    #[test]
    fn density_two_interpolates_linear_field() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 1);
        let mut solution = Solution::new(&model, &[0.0], 2).unwrap();

        solution.record_time_step(0, 0.0, &[10.0, 20.0, 30.0]).unwrap();

        let step_0 = solution.values_at(0).unwrap();
        let expected = [10.0, 15.0, 20.0, 25.0, 30.0];
        for (i, u_exp) in expected.iter().enumerate() {
            assert!((step_0[(0, i)] - u_exp).abs() < ACCURACY);
        }
    }

    #[test]
    fn density_two_renders_quadratic_element() {
        // f(x) = x^2 over one quadratic element: the view point at the element's center must
        // come from the full hierarchical expansion, not just the corner values
        let model = model(vec![0.0, 1.0], 2, 1);
        let mut solution = Solution::new(&model, &[0.0], 2).unwrap();

        let c_int = 1.0 / 6.0_f64.sqrt();
        solution.record_time_step(0, 0.0, &[0.0, c_int, 1.0]).unwrap();

        let step_0 = solution.values_at(0).unwrap();
        assert!((step_0[(0, 0)] - 0.0).abs() < ACCURACY);
        assert!((step_0[(0, 1)] - 0.25).abs() < ACCURACY);
        assert!((step_0[(0, 2)] - 1.0).abs() < ACCURACY);
    }

    #[cfg(feature = "json_export")]
    #[test]
    fn solution_json_export() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 1);
        let mut solution = Solution::new(&model, &[0.0, 0.25], 1).unwrap();
        solution.record_time_step(0, 0.0, &[1.0, 2.0, 3.0]).unwrap();
        solution.record_time_step(1, 0.25, &[4.0, 5.0, 6.0]).unwrap();

        std::fs::create_dir_all("./test_output").unwrap();
        solution.print_to_json("./test_output/solution_a.json").unwrap();

        let contents = std::fs::read_to_string("./test_output/solution_a.json").unwrap();
        let data = json::parse(&contents).unwrap();
        assert_eq!(data["x"].len(), 3);
        assert_eq!(data["t"].len(), 2);
        assert_eq!(data["u"][1][2].as_f64(), Some(6.0));
    }

    #[test]
    fn invalid_recording_requests_are_rejected() {
        let model = model(vec![0.0, 1.0, 2.0], 1, 1);
        assert_eq!(
            Solution::new(&model, &[0.0], 0).err(),
            Some(SolutionError::NoViewElems)
        );

        let mut solution = Solution::new(&model, &[0.0, 1.0], 1).unwrap();
        assert_eq!(
            solution.record_time_step(0, 0.0, &[1.0, 2.0]),
            Err(SolutionError::MismatchedSolutionSize(3, 2))
        );
        assert_eq!(
            solution.record_time_step(1, 1.0, &[1.0, 2.0, 3.0]),
            Err(SolutionError::NonContiguousStep(0, 1))
        );
        assert_eq!(
            solution.record_time_step(2, 2.0, &[1.0, 2.0, 3.0]),
            Err(SolutionError::StepOutOfRange(2, 2))
        );

        solution.record_time_step(0, 0.0, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            solution.values_at(1).err(),
            Some(SolutionError::StepOutOfRange(1, 1))
        );
    }
}
