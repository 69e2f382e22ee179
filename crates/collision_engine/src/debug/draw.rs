//! Debug draw list
//!
//! A renderer-agnostic list of wireframe primitives. Frame shapes live for a
//! number of seconds; persistent shapes stay until removed by id.

use std::collections::HashMap;

use crate::foundation::math::{Vec3, Vec4};
use crate::physics::collision::AABB;

/// Identifier for persistent debug shapes
pub type DebugShapeId = String;

/// Wireframe primitive for visualization
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Segment from `start` to `end`
    Line {
        /// Segment start
        start: Vec3,
        /// Segment end
        end: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },

    /// Axis-aligned box
    Box {
        /// Box center
        center: Vec3,
        /// Half size along each axis
        half_extents: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },

    /// Marker at a position
    Point {
        /// Marker position
        position: Vec3,
        /// RGBA color
        color: Vec4,
        /// Marker size in world units
        size: f32,
        /// Remaining lifetime in seconds
        duration: f32,
    },
}

impl DebugShape {
    /// Box covering `bounds`
    pub fn from_aabb(bounds: &AABB, color: Vec4, duration: f32) -> Self {
        DebugShape::Box {
            center: bounds.center(),
            half_extents: bounds.extents(),
            color,
            duration,
        }
    }

    fn duration_mut(&mut self) -> &mut f32 {
        match self {
            DebugShape::Line { duration, .. }
            | DebugShape::Box { duration, .. }
            | DebugShape::Point { duration, .. } => duration,
        }
    }

    /// Remaining lifetime
    pub fn duration(&self) -> f32 {
        match self {
            DebugShape::Line { duration, .. }
            | DebugShape::Box { duration, .. }
            | DebugShape::Point { duration, .. } => *duration,
        }
    }

    /// Color of the shape
    pub fn color(&self) -> Vec4 {
        match self {
            DebugShape::Line { color, .. }
            | DebugShape::Box { color, .. }
            | DebugShape::Point { color, .. } => *color,
        }
    }

    /// Age by `delta_time`; true once expired
    pub fn tick(&mut self, delta_time: f32) -> bool {
        let duration = self.duration_mut();
        *duration -= delta_time;
        *duration <= 0.0
    }
}

/// Collected debug shapes for one renderer to consume
#[derive(Debug, Clone)]
pub struct DebugDrawSystem {
    temporary_shapes: Vec<DebugShape>,
    persistent_shapes: HashMap<DebugShapeId, DebugShape>,

    /// Master enable flag; a disabled system records and returns nothing
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Create an empty, enabled system
    pub fn new() -> Self {
        Self {
            temporary_shapes: Vec::new(),
            persistent_shapes: HashMap::new(),
            enabled: true,
        }
    }

    /// Queue a temporary shape
    pub fn draw(&mut self, shape: DebugShape) {
        if self.enabled {
            self.temporary_shapes.push(shape);
        }
    }

    /// Queue a temporary line
    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32) {
        self.draw(DebugShape::Line { start, end, color, duration });
    }

    /// Queue a temporary box over `bounds`
    pub fn draw_aabb(&mut self, bounds: &AABB, color: Vec4, duration: f32) {
        self.draw(DebugShape::from_aabb(bounds, color, duration));
    }

    /// Queue a temporary point
    pub fn draw_point(&mut self, position: Vec3, color: Vec4, size: f32, duration: f32) {
        self.draw(DebugShape::Point { position, color, size, duration });
    }

    /// Store a shape that stays until [`Self::clear_persistent`]
    pub fn draw_persistent(&mut self, id: impl Into<String>, shape: DebugShape) {
        if self.enabled {
            self.persistent_shapes.insert(id.into(), shape);
        }
    }

    /// Remove one persistent shape
    pub fn clear_persistent(&mut self, id: &str) {
        self.persistent_shapes.remove(id);
    }

    /// Expire temporary shapes
    pub fn update(&mut self, delta_time: f32) {
        if self.enabled {
            self.temporary_shapes.retain_mut(|shape| !shape.tick(delta_time));
        }
    }

    /// All live shapes, temporary first
    pub fn shapes(&self) -> Vec<&DebugShape> {
        if !self.enabled {
            return Vec::new();
        }
        self.temporary_shapes.iter().chain(self.persistent_shapes.values()).collect()
    }

    /// Number of stored shapes
    pub fn shape_count(&self) -> usize {
        self.temporary_shapes.len() + self.persistent_shapes.len()
    }

    /// Drop every shape
    pub fn clear(&mut self) {
        self.temporary_shapes.clear();
        self.persistent_shapes.clear();
    }
}

impl Default for DebugDrawSystem {
    fn default() -> Self {
        Self::new()
    }
}
