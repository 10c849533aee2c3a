use std::fmt;
use std::fs::read_to_string;
use std::ops::Index;

/// A 1D Node Mesh: an ordered sequence of strictly increasing coordinates
///
/// Consecutive node pairs define the spans of the `Element`s in a [Model](super::Model). The
/// coordinate sequence is validated at construction and immutable thereafter.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    coords: Vec<f64>,
}

impl Mesh {
    /// Construct a Mesh from a coordinate sequence
    ///
    /// # Returns
    /// * An `Err` if there are fewer than 2 coordinates
    /// * An `Err` if the coordinates are not strictly increasing
    pub fn from_coords(coords: Vec<f64>) -> Result<Self, MeshError> {
        if coords.len() < 2 {
            return Err(MeshError::TooFewNodes(coords.len()));
        }
        for (i, pair) in coords.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(MeshError::NotStrictlyIncreasing(i + 1));
            }
        }
        Ok(Self { coords })
    }

    /// Construct a uniform Mesh of `num_nodes` evenly spaced nodes spanning `[min, max]`
    pub fn uniform(min: f64, max: f64, num_nodes: usize) -> Result<Self, MeshError> {
        if num_nodes < 2 {
            return Err(MeshError::TooFewNodes(num_nodes));
        }
        let h = (max - min) / ((num_nodes - 1) as f64);
        let mut coords: Vec<f64> = (0..num_nodes).map(|i| min + (i as f64) * h).collect();
        // pin the last node to avoid accumulation error at the right end
        coords[num_nodes - 1] = max;
        Self::from_coords(coords)
    }

    /// Construct a Mesh from a JSON file with the following format
    ///
    /// mesh.json
    /// ```JSON
    /// {
    ///     "nodes": [0.0, 0.25, 0.5, 0.75, 1.0]
    /// }
    /// ```
    pub fn from_file(path: impl AsRef<str>) -> Result<Self, MeshError> {
        let mesh_file_contents =
            read_to_string(path.as_ref()).map_err(|err| MeshError::FileError(err.to_string()))?;
        let mesh_file_json = json::parse(&mesh_file_contents)
            .map_err(|err| MeshError::MalformedFile(err.to_string()))?;

        let node_entries = &mesh_file_json["nodes"];
        if !node_entries.is_array() {
            return Err(MeshError::MalformedFile(String::from(
                "'nodes' array not found",
            )));
        }

        let coords = node_entries
            .members()
            .map(|entry| {
                entry.as_f64().ok_or_else(|| {
                    MeshError::MalformedFile(format!("'{}' is not a valid coordinate", entry))
                })
            })
            .collect::<Result<Vec<f64>, MeshError>>()?;

        Self::from_coords(coords)
    }

    /// The node coordinates in ascending order
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn num_nodes(&self) -> usize {
        self.coords.len()
    }

    /// Number of elements defined by this mesh (`num_nodes - 1`)
    pub fn num_elems(&self) -> usize {
        self.coords.len() - 1
    }

    /// Left-most node coordinate
    pub fn min(&self) -> f64 {
        self.coords[0]
    }

    /// Right-most node coordinate
    pub fn max(&self) -> f64 {
        self.coords[self.coords.len() - 1]
    }

    /// The physical span `(x_left, x_right)` of element `elem_idx`
    pub fn span_of(&self, elem_idx: usize) -> (f64, f64) {
        (self.coords[elem_idx], self.coords[elem_idx + 1])
    }
}

impl Index<usize> for Mesh {
    type Output = f64;

    fn index(&self, node_idx: usize) -> &Self::Output {
        &self.coords[node_idx]
    }
}

/// The Error Type for invalid Mesh definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    TooFewNodes(usize),
    NotStrictlyIncreasing(usize),
    FileError(String),
    MalformedFile(String),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooFewNodes(num_nodes) => write!(
                f,
                "A Mesh requires at least 2 nodes, but {} were provided; Cannot construct Mesh!",
                num_nodes
            ),
            Self::NotStrictlyIncreasing(node_idx) => write!(
                f,
                "Node {} is not strictly greater than its predecessor; Cannot construct Mesh!",
                node_idx
            ),
            Self::FileError(description) => {
                write!(f, "Unable to read Mesh file: {}!", description)
            }
            Self::MalformedFile(description) => {
                write!(f, "Unable to parse Mesh file: {}!", description)
            }
        }
    }
}

impl std::error::Error for MeshError {}
