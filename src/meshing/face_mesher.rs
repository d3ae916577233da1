//! # Face Mesher Module
//!
//! Face-culling mesher.
//!
//! Walks every cell of the object's bounded lattice and emits one unit quad
//! per voxel face whose neighbor is empty. No faces are merged.

use cgmath::Point3;
use log::debug;
use web_time::Instant;

use super::{
    compiled::{CompiledGeometry, PointLight},
    metadata::MetadataEncoder,
};
use crate::{
    error::{LoaderError, LoaderResult},
    voxels::{FaceDirection, Voxel, VoxelLattice, VoxelObject},
};

pub struct FaceMesher;

impl FaceMesher {
    /// Compiles a voxel object into face-culled geometry.
    ///
    /// The horizontal extent is the object's effective size, centered on the
    /// origin in lattice space. The vertical extent runs from row 0 to one row
    /// past the larger of `size` and the highest occupied row.
    ///
    /// # Arguments
    /// * `object` - The voxel object to mesh; it is validated first
    ///
    /// # Returns
    /// Flat geometry with one quad per visible face, the extracted point
    /// lights, and the metadata flags. Fails with `MalformedObject` when the
    /// object is out of bounds.
    pub fn compile(object: &VoxelObject) -> LoaderResult<CompiledGeometry> {
        object.validate()?;

        let started = Instant::now();
        let size = object.effective_size()?;
        let legacy_lighting = object.uses_legacy_lighting();

        let max_y = object
            .voxels
            .iter()
            .map(|v| v.mesh_cell().y)
            .fold(size, i32::max)
            .checked_add(1)
            .ok_or_else(|| LoaderError::MalformedObject("vertical extent overflows".to_string()))?;

        let start = Point3::new(-size / 2, 0, -size / 2);
        let lattice = VoxelLattice::new(
            &object.voxels,
            start,
            Point3::new(start.x + size, max_y, start.z + size),
        )?;

        let mut geometry = CompiledGeometry {
            particle_emitters: object.particle_emitters.clone(),
            ..Default::default()
        };

        for y in 0..max_y {
            for z in 0..size {
                for x in 0..size {
                    let cell = Point3::new(start.x + x, start.y + y, start.z + z);
                    let Some(voxel) = lattice.occupied_at(cell.x, cell.y, cell.z) else {
                        continue;
                    };

                    let local = [x as u32, y as u32, z as u32];
                    if voxel.emits_point_light() {
                        geometry.lights.push(PointLight {
                            x: local[0],
                            y: local[1],
                            z: local[2],
                            intensity: voxel.gi,
                            radius: voxel.gr.unwrap_or_default(),
                            color: voxel.c,
                        });
                    }

                    let occluded = lattice.occluded_faces(cell);
                    for face in FaceDirection::all() {
                        if !occluded[face as usize] {
                            Self::push_face(&mut geometry, voxel, face, local, legacy_lighting);
                        }
                    }
                }
            }
        }

        debug!(
            "Compiled {} voxels into {} faces and {} lights in {:?}",
            lattice.len(),
            geometry.face_count(),
            geometry.lights.len(),
            started.elapsed()
        );

        Ok(geometry)
    }

    /// Appends the four vertices and two triangles of one face.
    fn push_face(
        geometry: &mut CompiledGeometry,
        voxel: &Voxel,
        face: FaceDirection,
        local: [u32; 3],
        legacy_lighting: bool,
    ) {
        let base = geometry.vertex_count() as u32;
        let normal = face.normal();
        let color = voxel.c.to_f32_array();
        let metadata = MetadataEncoder::voxel_metadata(voxel, legacy_lighting);

        if voxel.has_light() {
            geometry.has_emissive = true;
        }
        if voxel.me {
            geometry.has_metal = true;
        }

        for corner in face.corners() {
            for axis in 0..3 {
                geometry
                    .positions
                    .push((corner.pos[axis] as u32 + local[axis]) as f32);
            }
            geometry.normals.extend_from_slice(&normal);
            geometry.colors.extend_from_slice(&color);

            let uvs = MetadataEncoder::encode_vertex(&metadata, corner.uv);
            geometry.emissive_uvs.extend_from_slice(&uvs.emissive);
            geometry.roughness_uvs.extend_from_slice(&uvs.roughness);
            geometry.metalness_uvs.extend_from_slice(&uvs.metalness);
        }

        geometry
            .indices
            .extend_from_slice(&Self::face_indices(base));
    }

    /// Index data for a face whose first vertex is `base`.
    pub fn face_indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base + 2, base + 1, base + 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::{Rgb, NEW_LIGHTING_CUTOFF_MS};

    fn red() -> Rgb {
        Rgb::new(255, 0, 0)
    }

    fn normals_of(geometry: &CompiledGeometry) -> Vec<[f32; 3]> {
        geometry
            .normals
            .chunks_exact(12)
            .map(|face| [face[0], face[1], face[2]])
            .collect()
    }

    #[test]
    fn isolated_voxel_has_six_faces() {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, red())]);
        let geometry = FaceMesher::compile(&object).unwrap();

        assert_eq!(geometry.face_count(), 6);
        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.indices.len() / 3, 12);
        assert!(!geometry.has_emissive);
        assert!(!geometry.has_metal);
        assert!(geometry.lights.is_empty());

        let normals = normals_of(&geometry);
        for face in FaceDirection::all() {
            assert_eq!(normals.iter().filter(|n| **n == face.normal()).count(), 1, "{face:?}");
        }
    }

    #[test]
    fn shared_face_is_culled_on_both_sides() {
        let object = VoxelObject::new(
            2,
            vec![Voxel::new(0, 0, 0, red()), Voxel::new(-1, 0, 0, red())],
        );
        let geometry = FaceMesher::compile(&object).unwrap();

        assert_eq!(geometry.face_count(), 10);
        let normals = normals_of(&geometry);
        assert_eq!(normals.iter().filter(|n| **n == FaceDirection::LEFT.normal()).count(), 1);
        assert_eq!(normals.iter().filter(|n| **n == FaceDirection::RIGHT.normal()).count(), 1);
    }

    #[test]
    fn vertical_neighbors_use_native_z() {
        let object = VoxelObject::new(
            2,
            vec![Voxel::new(0, 0, 0, red()), Voxel::new(0, 0, 1, red())],
        );
        let geometry = FaceMesher::compile(&object).unwrap();

        let normals = normals_of(&geometry);
        assert_eq!(geometry.face_count(), 10);
        assert_eq!(normals.iter().filter(|n| **n == FaceDirection::TOP.normal()).count(), 1);
    }

    #[test]
    fn positions_are_offset_by_the_loop_cell() {
        // Lattice x = -1 is loop column 0 for size 2.
        let object = VoxelObject::new(2, vec![Voxel::new(-1, 0, 0, red())]);
        let geometry = FaceMesher::compile(&object).unwrap();

        let xs: Vec<f32> = geometry.positions.iter().step_by(3).copied().collect();
        let zs: Vec<f32> = geometry.positions.iter().skip(2).step_by(3).copied().collect();
        assert!(xs.iter().all(|&x| x == 0.0 || x == 1.0));
        assert!(zs.iter().all(|&z| z == 1.0 || z == 2.0));
    }

    #[test]
    fn winding_and_colors() {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, Rgb::new(0, 51, 255))]);
        let geometry = FaceMesher::compile(&object).unwrap();

        assert_eq!(&geometry.indices[..12], &[0u32, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7]);
        for rgb in geometry.colors.chunks_exact(3) {
            assert_eq!(rgb, &[0.0f32, 0.2, 1.0]);
        }
    }

    #[test]
    fn lights_are_extracted_once_per_voxel() {
        let lamp = Voxel::new(0, 0, 0, red()).with_light(Some(2.0), Some(6.0));
        let glow = Voxel::new(-1, 0, 0, red()).with_light(Some(2.0), None);
        let geometry = FaceMesher::compile(&VoxelObject::new(2, vec![lamp, glow])).unwrap();

        assert_eq!(geometry.lights.len(), 1);
        let light = &geometry.lights[0];
        assert_eq!((light.x, light.y, light.z), (1, 0, 1));
        assert_eq!(light.radius, 6.0);
        assert_eq!(light.color, red());
        assert!(geometry.has_emissive);
    }

    #[test]
    fn emissive_encoding_depends_on_lighting_mode() {
        let lamp = Voxel::new(0, 0, 0, red()).with_light(Some(1.0), Some(1.0));
        let mut object = VoxelObject::new(2, vec![lamp]);

        let legacy = FaceMesher::compile(&object).unwrap();
        for u in legacy.emissive_uvs.iter().step_by(2) {
            assert_eq!(MetadataEncoder::texel(*u), 255);
        }

        object.vars.created_timestamp = Some(NEW_LIGHTING_CUTOFF_MS + 1);
        let modern = FaceMesher::compile(&object).unwrap();
        for u in modern.emissive_uvs.iter().step_by(2) {
            assert_eq!(MetadataEncoder::texel(*u), 51);
        }
    }

    #[test]
    fn metal_flag_sets_channel() {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, red()).with_metal()]);
        let geometry = FaceMesher::compile(&object).unwrap();

        assert!(geometry.has_metal);
        assert!(geometry
            .metalness_uvs
            .iter()
            .step_by(2)
            .all(|u| MetadataEncoder::texel(*u) == 191));
    }

    #[test]
    fn voxels_below_the_ground_row_are_skipped() {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, -1, red())]);
        let geometry = FaceMesher::compile(&object).unwrap();
        assert_eq!(geometry.face_count(), 0);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        for z in [3.0e9, 1.0e9] {
            let mut voxel = Voxel::new(0, 0, 0, red());
            voxel.z = z;
            assert!(matches!(
                FaceMesher::compile(&VoxelObject::new(2, vec![voxel])),
                Err(LoaderError::MalformedObject(_))
            ));
        }

        assert!(matches!(
            FaceMesher::compile(&VoxelObject::new(i32::MAX, vec![])),
            Err(LoaderError::MalformedObject(_))
        ));
    }

    #[test]
    fn neighbors_outside_the_extent_still_cull() {
        // Native x = 1 lies outside the size-2 extent (-1..1): it is never
        // meshed itself, but it hides the +X face of its neighbor.
        let object = VoxelObject::new(
            2,
            vec![Voxel::new(0, 0, 0, red()), Voxel::new(1, 0, 0, red())],
        );
        let geometry = FaceMesher::compile(&object).unwrap();

        assert_eq!(geometry.face_count(), 5);
        let normals = normals_of(&geometry);
        assert!(!normals.contains(&FaceDirection::RIGHT.normal()));
    }

    #[test]
    fn tall_objects_extend_the_vertical_range() {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 9, red())]);
        let geometry = FaceMesher::compile(&object).unwrap();
        assert_eq!(geometry.face_count(), 6);
    }

    #[test]
    fn faces_exist_iff_neighbor_is_empty() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let voxels: Vec<Voxel> = (0..40)
                .map(|_| Voxel::new(rng.i32(-3..3), rng.i32(-3..3), rng.i32(0..5), red()))
                .collect();
            let object = VoxelObject::new(6, voxels);
            let geometry = FaceMesher::compile(&object).unwrap();

            let start = Point3::new(-3, 0, -3);
            let lattice =
                VoxelLattice::new(&object.voxels, start, Point3::new(3, 7, 3)).unwrap();
            let mut expected = 0;
            for y in 0..7 {
                for z in -3..3 {
                    for x in -3..3 {
                        if lattice.occupied_at(x, y, z).is_some() {
                            expected += lattice
                                .occluded_faces(Point3::new(x, y, z))
                                .iter()
                                .filter(|hidden| !**hidden)
                                .count();
                        }
                    }
                }
            }

            assert_eq!(geometry.face_count(), expected);
            geometry.check_shape().unwrap();
        }
    }
}
