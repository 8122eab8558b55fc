// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Uniform grid broad phase
//!
//! Each object is bucketed into every cell its bounds touch. Queries walk
//! the cells of the query box row by row and return candidates in first-seen
//! order, so results are deterministic for a given insertion history.
//! Objects or queries spanning too many cells fall back to a linear scan.

use crate::math::Bounds;
use crate::scene::ObjectId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Cell count above which an object is kept out of the grid
const MAX_OBJECT_CELLS: i64 = 1024;

/// Cell count above which a query scans every entry instead
const MAX_QUERY_CELLS: i64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl CellRange {
    fn count(&self) -> i64 {
        (self.x1 as i64 - self.x0 as i64 + 1) * (self.y1 as i64 - self.y0 as i64 + 1)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    bounds: Bounds,
    cells: Option<CellRange>,
}

/// Uniform grid over object bounds
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<ObjectId>>,
    entries: BTreeMap<ObjectId, Entry>,
    oversized: Vec<ObjectId>,
}

impl SpatialGrid {
    /// Create an empty grid
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not positive and finite
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "Grid cell size must be positive and finite, got {}",
            cell_size
        );
        SpatialGrid {
            cell_size,
            cells: HashMap::new(),
            entries: BTreeMap::new(),
            oversized: Vec::new(),
        }
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no objects are tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last bounds recorded for `id`
    pub fn bounds(&self, id: ObjectId) -> Option<Bounds> {
        self.entries.get(&id).map(|e| e.bounds)
    }

    /// Insert or move an object
    pub fn update(&mut self, id: ObjectId, bounds: Bounds) {
        let range = self.cell_range(&bounds);
        let cells = (range.count() <= MAX_OBJECT_CELLS).then_some(range);

        if let Some(previous) = self.entries.get(&id).copied() {
            if previous.cells == cells && cells.is_some() {
                self.entries.insert(id, Entry { bounds, cells });
                return;
            }
            self.unlink(id, previous);
        }

        match cells {
            Some(range) => {
                for y in range.y0..=range.y1 {
                    for x in range.x0..=range.x1 {
                        self.cells.entry((x, y)).or_default().push(id);
                    }
                }
            }
            None => self.oversized.push(id),
        }
        self.entries.insert(id, Entry { bounds, cells });
    }

    /// Stop tracking an object
    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.unlink(id, entry);
                true
            }
            None => false,
        }
    }

    /// Append every object whose recorded bounds overlap `bounds`
    pub fn query(&self, bounds: &Bounds, out: &mut Vec<ObjectId>) {
        let range = self.cell_range(bounds);
        if range.count() > MAX_QUERY_CELLS {
            out.extend(
                self.entries
                    .iter()
                    .filter(|(_, e)| e.bounds.overlaps(bounds))
                    .map(|(id, _)| *id),
            );
            return;
        }

        let mut seen = HashSet::new();
        for y in range.y0..=range.y1 {
            for x in range.x0..=range.x1 {
                let Some(list) = self.cells.get(&(x, y)) else { continue };
                for &id in list {
                    if !seen.insert(id) {
                        continue;
                    }
                    if self.entries.get(&id).map_or(false, |e| e.bounds.overlaps(bounds)) {
                        out.push(id);
                    }
                }
            }
        }
        for &id in &self.oversized {
            if self.entries.get(&id).map_or(false, |e| e.bounds.overlaps(bounds)) {
                out.push(id);
            }
        }
    }

    fn unlink(&mut self, id: ObjectId, entry: Entry) {
        match entry.cells {
            Some(range) => {
                for y in range.y0..=range.y1 {
                    for x in range.x0..=range.x1 {
                        if let Some(list) = self.cells.get_mut(&(x, y)) {
                            list.retain(|other| *other != id);
                            if list.is_empty() {
                                self.cells.remove(&(x, y));
                            }
                        }
                    }
                }
            }
            None => self.oversized.retain(|other| *other != id),
        }
    }

    fn cell_range(&self, bounds: &Bounds) -> CellRange {
        let cs = self.cell_size;
        let to_cell = |v: f32| (v / cs).floor().clamp(i32::MIN as f32, i32::MAX as f32) as i32;
        CellRange {
            x0: to_cell(bounds.min.x),
            y0: to_cell(bounds.min.y),
            x1: to_cell(bounds.max.x),
            y1: to_cell(bounds.max.y),
        }
    }
}
