//! Uniform horizontal grid
//!
//! Cells are square in the XZ plane; height is ignored. A shape is listed
//! in every cell its bounding box touches. Shapes touching more cells than
//! the configured limit, or with non-finite bounds, go into an oversized
//! list that every query returns.

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::config::SpatialGridConfig;
use crate::physics::collision::AABB;
use super::spatial_query::SpatialQuery;

/// Integer cell coordinate `(x, z)`
pub type CellCoord = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Footprint {
    Cells { min: CellCoord, max: CellCoord },
    Oversized,
}

/// Uniform XZ grid mapping cells to keys
#[derive(Debug, Clone)]
pub struct SpatialGrid<K> {
    cell_size: f32,
    max_cells_per_shape: usize,
    cells: HashMap<CellCoord, Vec<K>>,
    oversized: Vec<K>,
    members: HashMap<K, Footprint>,
    dirty: bool,
}

impl<K: Copy + Ord + Hash + Send + Sync> SpatialGrid<K> {
    /// Create an empty grid
    pub fn new(config: &SpatialGridConfig) -> Self {
        let cell_size = if config.cell_size.is_finite() && config.cell_size > 0.0 {
            config.cell_size
        } else {
            SpatialGridConfig::default().cell_size
        };

        Self {
            cell_size,
            max_cells_per_shape: config.max_cells_per_shape.max(1),
            cells: HashMap::new(),
            oversized: Vec::new(),
            members: HashMap::new(),
            dirty: false,
        }
    }

    /// Edge length of one cell
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing the horizontal position `(x, z)`
    pub fn cell_coord(&self, x: f32, z: f32) -> CellCoord {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Cell rectangle covered by `bounds`, or oversized past the per-shape cell limit
    fn footprint(&self, bounds: &AABB) -> Footprint {
        if !bounds.is_finite() {
            return Footprint::Oversized;
        }

        let min = self.cell_coord(bounds.min.x, bounds.min.z);
        let max = self.cell_coord(bounds.max.x, bounds.max.z);
        let span_x = i64::from(max.0) - i64::from(min.0) + 1;
        let span_z = i64::from(max.1) - i64::from(min.1) + 1;

        if span_x <= 0 || span_z <= 0 || span_x.saturating_mul(span_z) > self.max_cells_per_shape as i64 {
            Footprint::Oversized
        } else {
            Footprint::Cells { min, max }
        }
    }

    fn cells_in(min: CellCoord, max: CellCoord) -> impl Iterator<Item = CellCoord> {
        (min.0..=max.0).flat_map(move |x| (min.1..=max.1).map(move |z| (x, z)))
    }

    /// Replace the whole content from `(key, bounds)` pairs and clear the dirty flag
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, AABB)>,
    {
        self.clear();
        for (key, bounds) in entries {
            self.insert(key, &bounds);
        }
        self.dirty = false;
    }

    /// Flag the grid as out of date with its owner's shapes
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the grid needs a rebuild before it can be trusted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Keys stored in one cell
    pub fn cell(&self, coord: CellCoord) -> &[K] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys kept outside the cells
    pub fn oversized(&self) -> &[K] {
        &self.oversized
    }

    fn insert_sorted(list: &mut Vec<K>, key: K) {
        if let Err(position) = list.binary_search(&key) {
            list.insert(position, key);
        }
    }

    fn remove_sorted(list: &mut Vec<K>, key: K) {
        if let Ok(position) = list.binary_search(&key) {
            list.remove(position);
        }
    }
}

impl<K: Copy + Ord + Hash + Send + Sync> SpatialQuery<K> for SpatialGrid<K> {
    fn insert(&mut self, key: K, bounds: &AABB) {
        if self.members.contains_key(&key) {
            self.remove(key);
        }

        let footprint = self.footprint(bounds);
        match footprint {
            Footprint::Cells { min, max } => {
                for coord in Self::cells_in(min, max) {
                    Self::insert_sorted(self.cells.entry(coord).or_default(), key);
                }
            }
            Footprint::Oversized => Self::insert_sorted(&mut self.oversized, key),
        }
        self.members.insert(key, footprint);
    }

    fn remove(&mut self, key: K) {
        match self.members.remove(&key) {
            Some(Footprint::Cells { min, max }) => {
                for coord in Self::cells_in(min, max) {
                    if let Some(list) = self.cells.get_mut(&coord) {
                        Self::remove_sorted(list, key);
                        if list.is_empty() {
                            self.cells.remove(&coord);
                        }
                    }
                }
            }
            Some(Footprint::Oversized) => Self::remove_sorted(&mut self.oversized, key),
            None => {}
        }
    }

    fn query_aabb(&self, aabb: &AABB) -> Option<Vec<K>> {
        let Footprint::Cells { min, max } = self.footprint(aabb) else {
            return None;
        };

        let mut candidates: Vec<K> = self.oversized.clone();
        for coord in Self::cells_in(min, max) {
            if let Some(list) = self.cells.get(&coord) {
                candidates.extend_from_slice(list);
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        Some(candidates)
    }

    fn query_column(&self, x: f32, z: f32) -> Vec<K> {
        let mut candidates: Vec<K> = self.oversized.clone();
        if x.is_finite() && z.is_finite() {
            candidates.extend_from_slice(self.cell(self.cell_coord(x, z)));
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.oversized.clear();
        self.members.clear();
    }

    fn entity_count(&self) -> usize {
        self.members.len()
    }
}
