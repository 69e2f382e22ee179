//! Collider visualization
//!
//! Turns the manager's collider list into debug-draw boxes. Box colliders
//! and precise colliders get different colors; precise colliders can also
//! show their BVH nodes down to a depth limit.

use crate::debug::draw::{DebugDrawSystem, DebugShape};
use crate::foundation::collections::ColliderKey;
use crate::foundation::math::{Vec3, Vec4};
use crate::physics::collision::CollisionShape;
use crate::physics::collision_manager::{CollisionManager, GroundHit};

/// Color scheme for collision visualization
#[derive(Clone, Debug)]
pub struct CollisionDebugColors {
    /// Box colliders
    pub box_shape: Vec4,
    /// Bounds of precise colliders
    pub precise_shape: Vec4,
    /// BVH node boxes
    pub bvh_node: Vec4,
    /// Colliders touched by the last highlighted query
    pub colliding: Vec4,
    /// Raycast lines and hit points
    pub ray: Vec4,
}

impl Default for CollisionDebugColors {
    fn default() -> Self {
        Self {
            box_shape: Vec4::new(0.0, 1.0, 0.0, 0.3),
            precise_shape: Vec4::new(1.0, 0.6, 0.0, 0.4),
            bvh_node: Vec4::new(0.5, 0.8, 1.0, 0.15),
            colliding: Vec4::new(1.0, 0.0, 0.0, 0.5),
            ray: Vec4::new(1.0, 1.0, 0.0, 1.0),
        }
    }
}

/// Debug view over a [`CollisionManager`]
#[derive(Debug, Clone)]
pub struct CollisionDebugVisualizer {
    debug_draw: DebugDrawSystem,
    colors: CollisionDebugColors,

    /// Draw collider bounds
    pub show_shapes: bool,

    /// Draw BVH nodes of precise colliders
    pub show_bvh: bool,

    /// Deepest BVH level drawn; the root is level 0
    pub bvh_max_depth: usize,
}

impl CollisionDebugVisualizer {
    /// Create a visualizer that draws collider bounds only
    pub fn new() -> Self {
        Self {
            debug_draw: DebugDrawSystem::new(),
            colors: CollisionDebugColors::default(),
            show_shapes: true,
            show_bvh: false,
            bvh_max_depth: 3,
        }
    }

    /// Set custom color scheme
    pub fn with_colors(mut self, colors: CollisionDebugColors) -> Self {
        self.colors = colors;
        self
    }

    /// Enable BVH node drawing down to `max_depth`
    pub fn with_bvh(mut self, max_depth: usize) -> Self {
        self.show_bvh = true;
        self.bvh_max_depth = max_depth;
        self
    }

    /// Queue one frame of boxes for every collider in `manager`
    ///
    /// Colliders listed in `highlighted` use the colliding color.
    pub fn draw_colliders(&mut self, manager: &CollisionManager, highlighted: &[ColliderKey]) {
        for (key, shape) in manager.colliders() {
            self.draw_collision_shape(shape, highlighted.contains(&key));
        }
    }

    /// Queue one frame of boxes for a single shape
    pub fn draw_collision_shape(&mut self, shape: &CollisionShape, is_colliding: bool) {
        if self.show_shapes {
            let color = if is_colliding {
                self.colors.colliding
            } else if shape.is_precise() {
                self.colors.precise_shape
            } else {
                self.colors.box_shape
            };
            self.debug_draw.draw_aabb(shape.bounding_box(), color, 0.0);
        }

        if self.show_bvh {
            if let Some(bvh) = shape.bvh() {
                for (depth, bounds) in bvh.node_bounds() {
                    if depth <= self.bvh_max_depth {
                        self.debug_draw.draw_aabb(&bounds, self.colors.bvh_node, 0.0);
                    }
                }
            }
        }
    }

    /// Queue a downward ray and, when it hit, the hit point
    pub fn draw_ground_ray(&mut self, origin: Vec3, max_distance: f32, hit: Option<&GroundHit>) {
        let end = hit.map_or(origin - Vec3::y() * max_distance, |hit| hit.point);
        self.debug_draw.draw_line(origin, end, self.colors.ray, 0.0);
        if let Some(hit) = hit {
            self.debug_draw.draw_point(hit.point, self.colors.ray, 0.1, 0.0);
        }
    }

    /// Drop all queued shapes
    pub fn clear(&mut self) {
        self.debug_draw.clear();
    }

    /// Expire shapes from earlier frames
    pub fn update(&mut self, delta_time: f32) {
        self.debug_draw.update(delta_time);
    }

    /// Shapes for the renderer
    pub fn shapes(&self) -> Vec<&DebugShape> {
        self.debug_draw.shapes()
    }

    /// Enable or disable all drawing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.debug_draw.enabled = enabled;
    }

    /// Whether drawing is enabled
    pub fn is_enabled(&self) -> bool {
        self.debug_draw.enabled
    }

    /// Underlying draw list
    pub fn debug_draw_mut(&mut self) -> &mut DebugDrawSystem {
        &mut self.debug_draw
    }
}

impl Default for CollisionDebugVisualizer {
    fn default() -> Self {
        Self::new()
    }
}
