use glam::{IVec3, Vec3};

use crate::block::BlockSide;

const PARALLEL_EPSILON: f32 = 0.000_001;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

/// Result of a ray/box slab test.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub t: f32,
    /// Face of the box the ray entered through; `None` when the ray starts
    /// inside the box.
    pub face: Option<BlockSide>,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The unit cube occupied by the block at `block`.
    pub fn block(block: IVec3) -> Self {
        let min = block.as_vec3();
        Self {
            min,
            max: min + Vec3::ONE,
        }
    }

    /// Slab intersection of `ray` (from its origin, `t >= 0`) with this box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let origin = ray.origin;
        let direction = ray.direction;

        let mut t_min = 0.0_f32;
        let mut t_max = f32::MAX;
        let mut entry_axis = None;

        for axis in 0..3 {
            if direction[axis].abs() < PARALLEL_EPSILON {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction[axis];
            let mut t_near = (self.min[axis] - origin[axis]) * inv;
            let mut t_far = (self.max[axis] - origin[axis]) * inv;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            if t_near > t_min {
                t_min = t_near;
                entry_axis = Some(axis);
            }
            if t_far < t_max {
                t_max = t_far;
            }
            if t_min > t_max {
                return None;
            }
        }

        let face = entry_axis.map(|axis| {
            let positive = direction[axis] > 0.0;
            match (axis, positive) {
                (0, true) => BlockSide::Left,
                (0, false) => BlockSide::Right,
                (1, true) => BlockSide::Bottom,
                (1, false) => BlockSide::Top,
                (_, true) => BlockSide::Back,
                (_, false) => BlockSide::Front,
            }
        });

        Some(RayHit {
            point: origin + direction * t_min,
            t: t_min,
            face,
        })
    }
}

/// A picking ray that the caller advances in fixed steps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    end: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            end: origin,
        }
    }

    pub fn step(&mut self, scale: f32) {
        self.end += self.direction * scale;
    }

    /// Current traversal point.
    pub fn end(&self) -> Vec3 {
        self.end
    }

    pub fn length(&self) -> f32 {
        self.origin.distance(self.end)
    }
}
