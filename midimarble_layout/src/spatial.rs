// Uniform-grid spatial hash over placed walls.
//
// The index is an arena: walls live in an append-only `Vec<Wall>` and are
// referred to by their position in it. Each wall registers its arena index
// in the cell containing its centre and in all 8 neighbouring cells, so a
// query only has to look at the cells around the query point itself and
// can still never miss a wall close enough to interact with it (the cell
// edge is larger than half a wall plus the clearance distance).
//
// Backtracking needs to take back the most recent placement, so the index
// supports `undo_last()`. Because indices are handed out in increasing
// order and only the newest wall is ever undone, the undone index is always
// the tail of every cell list it appears in; the prune is still written
// as a filter so a cell can never keep a stale index.
//
// The index is the single source of truth for what has been placed. Both
// the main search and the chord planner read and write it; nothing else
// keeps a separate wall list.
//
// **Critical constraint: determinism.** Query results are returned sorted
// by arena index, so hash iteration order never leaks into the planner.

use crate::geom::{Vec2, segments_cross, wall_segment};
use crate::wall::Wall;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Integer grid cell coordinate.
pub type CellKey = (i64, i64);

/// Offsets of a cell and its 8 neighbours.
const NEIGHBORHOOD: [(i64, i64); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Spatial hash of placed walls.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: FxHashMap<CellKey, SmallVec<[u32; 4]>>,
    walls: Vec<Wall>,
}

impl SpatialIndex {
    /// Create an empty index. `cell_size` must be positive.
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be positive");
        Self {
            cell_size,
            cells: FxHashMap::default(),
            walls: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Cell containing the point `(x, y)`.
    pub fn cell_of(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    pub fn len(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// All placed walls, in placement order.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn wall(&self, index: usize) -> &Wall {
        &self.walls[index]
    }

    pub fn last(&self) -> Option<&Wall> {
        self.walls.last()
    }

    /// Append a wall and register it in its cell and the 8 neighbours.
    pub fn add(&mut self, wall: Wall) {
        let index = self.walls.len() as u32;
        let (gx, gy) = self.cell_of(wall.pos.x, wall.pos.y);
        for (dx, dy) in NEIGHBORHOOD {
            self.cells.entry((gx + dx, gy + dy)).or_default().push(index);
        }
        self.walls.push(wall);
    }

    /// Remove the most recently added wall from the arena and from every
    /// cell it was registered in. No-op on an empty index.
    pub fn undo_last(&mut self) -> Option<Wall> {
        let wall = self.walls.pop()?;
        let index = self.walls.len() as u32;
        let (gx, gy) = self.cell_of(wall.pos.x, wall.pos.y);
        for (dx, dy) in NEIGHBORHOOD {
            let key = (gx + dx, gy + dy);
            if let Some(list) = self.cells.get_mut(&key) {
                list.retain(|i| *i != index);
                if list.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
        Some(wall)
    }

    /// Wall indices registered in the 3x3 neighbourhood of the cell holding
    /// `(x, y)`. Sorted and de-duplicated.
    pub fn query_near(&self, x: f64, y: f64) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_near(self.cell_of(x, y), &mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Union of `query_near` sampled along `origin -> end`, densely enough
    /// that no cell the segment passes through is skipped.
    pub fn query_along(&self, origin: Vec2, end: Vec2) -> Vec<usize> {
        let delta = end - origin;
        let steps = ((delta.length() / self.cell_size) as usize + 2).max(3);
        let mut out = Vec::new();
        let mut last_cell = None;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let p = origin + delta * t;
            let cell = self.cell_of(p.x, p.y);
            if last_cell == Some(cell) {
                continue;
            }
            last_cell = Some(cell);
            self.collect_near(cell, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_near(&self, (gx, gy): CellKey, out: &mut Vec<usize>) {
        for (dx, dy) in NEIGHBORHOOD {
            if let Some(list) = self.cells.get(&(gx + dx, gy + dy)) {
                out.extend(list.iter().map(|&i| i as usize));
            }
        }
    }

    /// Distance from `p` to the nearest wall centre in its neighbourhood,
    /// or `empty` when the neighbourhood holds no walls.
    pub fn nearest_wall_distance(&self, p: Vec2, empty: f64) -> f64 {
        self.query_near(p.x, p.y)
            .into_iter()
            .map(|i| self.walls[i].pos.distance(p))
            .fold(empty, f64::min)
    }

    /// Whether any wall centre in the neighbourhood of `p` is closer than
    /// `clearance`.
    pub fn crowded(&self, p: Vec2, clearance: f64) -> bool {
        self.query_near(p.x, p.y)
            .into_iter()
            .any(|i| self.walls[i].pos.distance(p) < clearance)
    }

    /// Whether a wall of `wall_length` at `pos`/`rotation_deg` would cross
    /// any placed wall segment.
    pub fn wall_crosses_any(
        &self,
        pos: Vec2,
        rotation_deg: f64,
        wall_length: f64,
        margin: f64,
    ) -> bool {
        let candidate = wall_segment(pos, rotation_deg, wall_length);
        self.query_near(pos.x, pos.y).into_iter().any(|i| {
            let w = &self.walls[i];
            segments_cross(candidate, wall_segment(w.pos, w.rotation_deg, wall_length), margin)
        })
    }

    /// Number of walls whose centre lies within `threshold` of an earlier
    /// wall. Each wall is counted at most once.
    pub fn count_overlaps(&self, threshold: f64) -> usize {
        (1..self.walls.len())
            .filter(|&i| {
                let p = self.walls[i].pos;
                self.query_near(p.x, p.y)
                    .into_iter()
                    .any(|j| j < i && self.walls[j].pos.distance(p) < threshold)
            })
            .count()
    }

    /// Distinct wall indices currently registered in any cell.
    pub fn registered_count(&self) -> usize {
        let mut all: Vec<u32> = self.cells.values().flatten().copied().collect();
        all.sort_unstable();
        all.dedup();
        all.len()
    }

    /// Highest wall index registered in any cell.
    pub fn max_registered(&self) -> Option<usize> {
        self.cells.values().flatten().map(|&i| i as usize).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::ChordNote;
    use crate::wall::WallKind;

    fn wall_at(id: u32, x: f64, y: f64) -> Wall {
        Wall::new(
            id,
            0.0,
            WallKind::Plain,
            Vec2::new(x, y),
            0.0,
            ChordNote {
                pitch: 60,
                velocity: 100,
                instrument: 0,
            },
        )
    }

    #[test]
    fn add_registers_neighbourhood() {
        let mut index = SpatialIndex::new(50.0);
        index.add(wall_at(1, 10.0, 10.0));
        assert_eq!(index.len(), 1);
        // Every point within one cell of the wall's cell sees it.
        assert_eq!(index.query_near(-40.0, -40.0), vec![0]);
        assert_eq!(index.query_near(99.0, 99.0), vec![0]);
        // Three cells away does not.
        assert!(index.query_near(160.0, 10.0).is_empty());
    }

    #[test]
    fn negative_coordinates_hash_with_floor() {
        let index = SpatialIndex::new(50.0);
        assert_eq!(index.cell_of(-0.1, 0.0), (-1, 0));
        assert_eq!(index.cell_of(49.9, -50.0), (0, -1));
    }

    #[test]
    fn undo_last_prunes_cells() {
        let mut index = SpatialIndex::new(50.0);
        index.add(wall_at(1, 0.0, 0.0));
        index.add(wall_at(2, 20.0, 0.0));
        assert_eq!(index.query_near(0.0, 0.0), vec![0, 1]);

        let undone = index.undo_last().unwrap();
        assert_eq!(undone.id, 2);
        assert_eq!(index.query_near(0.0, 0.0), vec![0]);
        assert_eq!(index.registered_count(), index.len());

        index.undo_last();
        assert!(index.is_empty());
        assert_eq!(index.registered_count(), 0);
        assert!(index.undo_last().is_none());
    }

    #[test]
    fn add_undo_sequences_stay_consistent() {
        let mut index = SpatialIndex::new(50.0);
        for step in 0..200u32 {
            if step % 3 == 2 {
                index.undo_last();
            } else {
                let x = (step as f64 * 37.0) % 400.0 - 200.0;
                let y = (step as f64 * 53.0) % 300.0 - 150.0;
                index.add(wall_at(step, x, y));
            }
            assert_eq!(index.registered_count(), index.len());
            if let Some(max) = index.max_registered() {
                assert!(max < index.len());
            }
        }
    }

    #[test]
    fn query_along_covers_long_segments() {
        let mut index = SpatialIndex::new(50.0);
        index.add(wall_at(1, 500.0, 0.0));
        index.add(wall_at(2, 250.0, 400.0));
        let hits = index.query_along(Vec2::ZERO, Vec2::new(1000.0, 0.0));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn nearest_and_crowded() {
        let mut index = SpatialIndex::new(50.0);
        assert_eq!(index.nearest_wall_distance(Vec2::ZERO, 999.0), 999.0);
        index.add(wall_at(1, 30.0, 40.0));
        assert_eq!(index.nearest_wall_distance(Vec2::ZERO, 999.0), 50.0);
        assert!(index.crowded(Vec2::new(30.0, 30.0), 25.0));
        assert!(!index.crowded(Vec2::ZERO, 25.0));
    }

    #[test]
    fn crossing_walls_detected() {
        let mut index = SpatialIndex::new(50.0);
        index.add(wall_at(1, 0.0, 0.0)); // horizontal
        assert!(index.wall_crosses_any(Vec2::new(5.0, 0.0), 90.0, 30.0, 0.5));
        assert!(!index.wall_crosses_any(Vec2::new(5.0, 40.0), 90.0, 30.0, 0.5));
    }

    #[test]
    fn overlaps_counted_once_per_wall() {
        let mut index = SpatialIndex::new(50.0);
        index.add(wall_at(1, 0.0, 0.0));
        index.add(wall_at(2, 5.0, 0.0));
        index.add(wall_at(3, 0.0, 5.0));
        index.add(wall_at(4, 300.0, 0.0));
        assert_eq!(index.count_overlaps(20.0), 2);
    }
}
