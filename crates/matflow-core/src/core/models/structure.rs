use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Periodic lattice whose rows are the lattice vectors `a`, `b` and `c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    matrix: Matrix3<f64>,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|i, j| rows[i][j]))
    }

    pub fn cubic(a: f64) -> Self {
        Self::new(Matrix3::identity() * a)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Applies a deformation gradient `F` to every lattice vector (`a' = F a`).
    pub fn deformed(&self, deformation: &Matrix3<f64>) -> Self {
        Self::new(self.matrix * deformation.transpose())
    }

    /// Isotropically rescales the lattice so that its volume becomes `volume`.
    pub fn scaled_to_volume(&self, volume: f64) -> Self {
        let factor = (volume / self.volume()).cbrt();
        Self::new(self.matrix * factor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub species: String,
    pub frac_coords: Vector3<f64>,
}

impl Site {
    pub fn new(species: impl Into<String>, frac_coords: [f64; 3]) -> Self {
        Self {
            species: species.into(),
            frac_coords: Vector3::from(frac_coords),
        }
    }
}

/// A periodic crystal structure in fractional coordinates.
///
/// Deforming or rescaling a structure only touches the lattice; the fractional
/// coordinates of every site are carried over unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    pub sites: Vec<Site>,
}

impl Structure {
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Self {
        Self { lattice, sites }
    }

    pub fn volume(&self) -> f64 {
        self.lattice.volume()
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn deformed(&self, deformation: &Matrix3<f64>) -> Self {
        Self {
            lattice: self.lattice.deformed(deformation),
            sites: self.sites.clone(),
        }
    }

    pub fn scaled_to_volume(&self, volume: f64) -> Self {
        Self {
            lattice: self.lattice.scaled_to_volume(volume),
            sites: self.sites.clone(),
        }
    }
}
