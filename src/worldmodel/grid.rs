// grid.rs: discretised occupancy map.
//
// One label per unit cell, row-major [height × width].  Only reporting and
// visualisation read it; collision checks always use the continuous geometry.

use serde::{Deserialize, Serialize};

/// What occupies a cell of the occupancy map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellLabel {
    Empty = 0,
    Obstacle = 1,
    Agent = 2,
    Target = 3,
    SafeZone = 4,
}

/// Row-major label grid covering the whole arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyMap {
    width: usize,
    height: usize,
    cells: Vec<CellLabel>,
}

impl OccupancyMap {
    pub fn new(width: usize, height: usize) -> Self {
        OccupancyMap {
            width,
            height,
            cells: vec![CellLabel::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Label at integer cell (col, row); `None` outside the arena.
    pub fn get(&self, col: usize, row: usize) -> Option<CellLabel> {
        if col < self.width && row < self.height {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[CellLabel] {
        &self.cells
    }

    pub fn count(&self, label: CellLabel) -> usize {
        self.cells.iter().filter(|c| **c == label).count()
    }

    /// Mark `[ceil(x-hw), ceil(x+hw)) × [ceil(y-hh), ceil(y+hh))`, clipped to the arena.
    pub fn place_region(&mut self, x: f64, y: f64, half_w: f64, half_h: f64, label: CellLabel) {
        let (x0, x1) = clip_span(x - half_w, x + half_w, self.width);
        let (y0, y1) = clip_span(y - half_h, y + half_h, self.height);

        for row in y0..y1 {
            let base = row * self.width;
            self.cells[base + x0..base + x1].fill(label);
        }
    }

    pub fn clear_region(&mut self, x: f64, y: f64, half_w: f64, half_h: f64) {
        self.place_region(x, y, half_w, half_h, CellLabel::Empty);
    }

    /// Relabel cells holding `from` inside the region; other labels are kept.
    pub fn replace_in_region(
        &mut self,
        x: f64,
        y: f64,
        half_w: f64,
        half_h: f64,
        from: CellLabel,
        to: CellLabel,
    ) {
        let (x0, x1) = clip_span(x - half_w, x + half_w, self.width);
        let (y0, y1) = clip_span(y - half_h, y + half_h, self.height);

        for row in y0..y1 {
            let base = row * self.width;
            for cell in &mut self.cells[base + x0..base + x1] {
                if *cell == from {
                    *cell = to;
                }
            }
        }
    }

    /// Labels as raw integers, row by row.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| *c as u8).collect())
            .collect()
    }
}

/// Ceil both ends and clip into `[0, limit]`; empty when inverted.
fn clip_span(lo: f64, hi: f64, limit: usize) -> (usize, usize) {
    let clip = |v: f64| -> usize {
        let v = v.ceil();
        if v <= 0.0 {
            0
        } else if v >= limit as f64 {
            limit
        } else {
            v as usize
        }
    };
    let (a, b) = (clip(lo), clip(hi));
    if a < b {
        (a, b)
    } else {
        (a, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_region_uses_ceiling_bounds() {
        let mut map = OccupancyMap::new(10, 10);
        // x in [ceil(1.5), ceil(4.5)) = [2, 5), y in [ceil(2.2), ceil(3.8)) = [3, 4)
        map.place_region(3.0, 3.0, 1.5, 0.8, CellLabel::Obstacle);
        assert_eq!(map.count(CellLabel::Obstacle), 3);
        assert_eq!(map.get(2, 3), Some(CellLabel::Obstacle));
        assert_eq!(map.get(4, 3), Some(CellLabel::Obstacle));
        assert_eq!(map.get(5, 3), Some(CellLabel::Empty));
        assert_eq!(map.get(1, 3), Some(CellLabel::Empty));
    }

    #[test]
    fn place_region_clips_to_arena() {
        let mut map = OccupancyMap::new(8, 8);
        map.place_region(0.0, 7.5, 3.0, 3.0, CellLabel::Target);
        // x in [0, 3), y in [5, 8)
        assert_eq!(map.count(CellLabel::Target), 9);
        assert_eq!(map.get(0, 7), Some(CellLabel::Target));
        assert_eq!(map.get(8, 7), None);
    }

    #[test]
    fn region_fully_outside_is_ignored() {
        let mut map = OccupancyMap::new(5, 5);
        map.place_region(-10.0, -10.0, 1.0, 1.0, CellLabel::Agent);
        map.place_region(20.0, 2.0, 1.0, 1.0, CellLabel::Agent);
        assert_eq!(map.count(CellLabel::Agent), 0);
    }

    #[test]
    fn clear_region_resets_to_empty() {
        let mut map = OccupancyMap::new(6, 6);
        map.place_region(3.0, 3.0, 1.0, 1.0, CellLabel::Agent);
        assert_eq!(map.count(CellLabel::Agent), 4);
        map.clear_region(3.0, 3.0, 1.0, 1.0);
        assert_eq!(map.count(CellLabel::Empty), 36);
    }

    #[test]
    fn replace_only_touches_matching_cells() {
        let mut map = OccupancyMap::new(6, 6);
        map.place_region(2.0, 2.0, 1.0, 1.0, CellLabel::Obstacle);
        map.place_region(3.0, 2.0, 1.0, 1.0, CellLabel::Agent);
        map.replace_in_region(3.0, 2.0, 1.0, 1.0, CellLabel::Agent, CellLabel::Empty);
        // x in [1, 3) stays obstacle where the agent did not overwrite it
        assert_eq!(map.count(CellLabel::Agent), 0);
        assert_eq!(map.count(CellLabel::Obstacle), 2);
        assert_eq!(map.get(1, 1), Some(CellLabel::Obstacle));
    }

    #[test]
    fn rows_match_dimensions() {
        let map = OccupancyMap::new(4, 3);
        let rows = map.to_rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 4));
    }
}
