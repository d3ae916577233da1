//! # Voxel Lattice Module
//!
//! A read-only indexed view over a voxel object's sparse voxel list.
//!
//! ## Storage
//!
//! - `cells`: maps each occupied mesh-axis cell to the index of its voxel
//! - `solid_array`: a bit per cell over the meshed extent plus one cell of
//!   padding on every side, so the six neighbor checks made for every voxel
//!   never touch the hash map
//!
//! When several voxels round to the same cell, the first one in list order
//! owns the cell.

use std::collections::HashMap;

use bitvec::prelude::BitVec;
use cgmath::Point3;

use super::{
    face_direction::FaceDirection,
    voxel::{Voxel, MAX_LATTICE_EXTENT},
};
use crate::error::{LoaderError, LoaderResult};

/// Largest padded occupancy grid a lattice will allocate: the full meshed
/// extent of the largest accepted object.
const MAX_GRID_CELLS: usize = (MAX_LATTICE_EXTENT as usize + 3).pow(3);

pub struct VoxelLattice<'a> {
    voxels: &'a [Voxel],
    cells: HashMap<Point3<i32>, usize>,
    /// Minimum corner of the padded extent.
    origin: [i64; 3],
    /// Dimensions of the padded extent.
    dims: [usize; 3],
    solid_array: BitVec,
}

impl<'a> VoxelLattice<'a> {
    /// Indexes `voxels` for queries over the mesh-axis extent `min..max`
    /// (exclusive on the upper bound).
    ///
    /// Fails with `MalformedObject` when the padded extent would exceed the
    /// grid of the largest accepted object.
    pub fn new(voxels: &'a [Voxel], min: Point3<i32>, max: Point3<i32>) -> LoaderResult<Self> {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 2).max(0) as usize;
        let dims = [span(min.x, max.x), span(min.y, max.y), span(min.z, max.z)];

        let grid_cells = dims
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .filter(|&cells| cells <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                LoaderError::MalformedObject(format!("lattice extent {dims:?} is too large"))
            })?;

        let mut lattice = VoxelLattice {
            voxels,
            cells: HashMap::with_capacity(voxels.len()),
            origin: [
                i64::from(min.x) - 1,
                i64::from(min.y) - 1,
                i64::from(min.z) - 1,
            ],
            dims,
            solid_array: BitVec::repeat(false, grid_cells),
        };

        for (index, voxel) in voxels.iter().enumerate() {
            let cell = voxel.mesh_cell();
            if lattice.cells.contains_key(&cell) {
                continue;
            }

            lattice.cells.insert(cell, index);
            if let Some(bit) = lattice.bit_index(cell) {
                lattice.solid_array.set(bit, true);
            }
        }

        Ok(lattice)
    }

    /// Returns the voxel occupying the given mesh-axis cell, if any.
    pub fn occupied_at(&self, x: i32, y: i32, z: i32) -> Option<&'a Voxel> {
        let voxels = self.voxels;
        self.cells.get(&Point3::new(x, y, z)).map(|&i| &voxels[i])
    }

    /// Checks whether the given mesh-axis cell is occupied.
    pub fn is_solid(&self, cell: Point3<i32>) -> bool {
        match self.bit_index(cell) {
            Some(bit) => self.solid_array[bit],
            None => self.cells.contains_key(&cell),
        }
    }

    /// For each face of the cell, in `FaceDirection` order, whether the
    /// neighboring cell on that side is occupied and the face is hidden.
    pub fn occluded_faces(&self, cell: Point3<i32>) -> [bool; 6] {
        let mut occluded = [false; 6];
        for face in FaceDirection::all() {
            occluded[face as usize] = neighbor(cell, face).is_some_and(|n| self.is_solid(n));
        }
        occluded
    }

    /// Number of distinct occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn bit_index(&self, cell: Point3<i32>) -> Option<usize> {
        let local = [
            i64::from(cell.x) - self.origin[0],
            i64::from(cell.y) - self.origin[1],
            i64::from(cell.z) - self.origin[2],
        ];

        if local
            .iter()
            .zip(self.dims)
            .any(|(&l, dim)| l < 0 || l as usize >= dim)
        {
            return None;
        }

        let [i, j, k] = local.map(|l| l as usize);
        Some(i + self.dims[0] * j + self.dims[0] * self.dims[1] * k)
    }
}

/// The adjacent cell across `face`, if it is representable.
fn neighbor(cell: Point3<i32>, face: FaceDirection) -> Option<Point3<i32>> {
    let offset = face.offset();
    Some(Point3::new(
        cell.x.checked_add(offset.x)?,
        cell.y.checked_add(offset.y)?,
        cell.z.checked_add(offset.z)?,
    ))
}
