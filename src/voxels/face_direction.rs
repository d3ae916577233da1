//! # Face Direction Module
//!
//! The six axis-aligned faces of a unit voxel, in the order the mesher emits
//! them, together with their fixed corner templates.

use cgmath::Vector3;

/// Lower texture-coordinate bound of a face corner.
pub const UV_TEXT_MIN: f32 = 0.02;
/// Upper texture-coordinate bound of a face corner.
pub const UV_TEXT_MAX: f32 = 0.98;

/// One corner of a face template: offset from the voxel's minimum corner and
/// the base texture coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceCorner {
    pub pos: [u8; 3],
    pub uv: [f32; 2],
}

const fn corner(pos: [u8; 3], uv: [f32; 2]) -> FaceCorner {
    FaceCorner { pos, uv }
}

const MIN: f32 = UV_TEXT_MIN;
const MAX: f32 = UV_TEXT_MAX;

/// Corner templates indexed by `FaceDirection as usize`.
///
/// Each template lists its corners so that the triangles
/// `(0, 1, 2)` and `(2, 1, 3)` wind counter-clockwise seen from outside.
static FACE_CORNERS: [[FaceCorner; 4]; 6] = [
    // LEFT
    [
        corner([0, 1, 0], [MIN, MAX]),
        corner([0, 0, 0], [MIN, MIN]),
        corner([0, 1, 1], [MAX, MAX]),
        corner([0, 0, 1], [MAX, MIN]),
    ],
    // RIGHT
    [
        corner([1, 1, 1], [MIN, MAX]),
        corner([1, 0, 1], [MIN, MIN]),
        corner([1, 1, 0], [MAX, MAX]),
        corner([1, 0, 0], [MAX, MIN]),
    ],
    // BOTTOM
    [
        corner([1, 0, 1], [MAX, MIN]),
        corner([0, 0, 1], [MIN, MIN]),
        corner([1, 0, 0], [MAX, MAX]),
        corner([0, 0, 0], [MIN, MAX]),
    ],
    // TOP
    [
        corner([0, 1, 1], [MAX, MAX]),
        corner([1, 1, 1], [MIN, MAX]),
        corner([0, 1, 0], [MAX, MIN]),
        corner([1, 1, 0], [MIN, MIN]),
    ],
    // BACK
    [
        corner([1, 0, 0], [MIN, MIN]),
        corner([0, 0, 0], [MAX, MIN]),
        corner([1, 1, 0], [MIN, MAX]),
        corner([0, 1, 0], [MAX, MAX]),
    ],
    // FRONT
    [
        corner([0, 0, 1], [MIN, MIN]),
        corner([1, 0, 1], [MAX, MIN]),
        corner([0, 1, 1], [MIN, MAX]),
        corner([1, 1, 1], [MAX, MAX]),
    ],
];

/// Represents the six possible faces of a voxel.
///
/// The order is: [LEFT, RIGHT, BOTTOM, TOP, BACK, FRONT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum FaceDirection {
    /// Facing negative X
    LEFT = 0,
    /// Facing positive X
    RIGHT = 1,
    /// Facing negative Y
    BOTTOM = 2,
    /// Facing positive Y
    TOP = 3,
    /// Facing negative Z
    BACK = 4,
    /// Facing positive Z
    FRONT = 5,
}

impl FaceDirection {
    /// All six faces in emission order.
    pub fn all() -> [FaceDirection; 6] {
        [
            FaceDirection::LEFT,
            FaceDirection::RIGHT,
            FaceDirection::BOTTOM,
            FaceDirection::TOP,
            FaceDirection::BACK,
            FaceDirection::FRONT,
        ]
    }

    /// Unit offset towards the neighboring cell this face looks at.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            FaceDirection::LEFT => Vector3::new(-1, 0, 0),
            FaceDirection::RIGHT => Vector3::new(1, 0, 0),
            FaceDirection::BOTTOM => Vector3::new(0, -1, 0),
            FaceDirection::TOP => Vector3::new(0, 1, 0),
            FaceDirection::BACK => Vector3::new(0, 0, -1),
            FaceDirection::FRONT => Vector3::new(0, 0, 1),
        }
    }

    /// Outward face normal.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }

    /// The fixed corner template for this face.
    pub fn corners(self) -> &'static [FaceCorner; 4] {
        &FACE_CORNERS[self as usize]
    }
}
