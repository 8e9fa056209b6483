// Uniform grid over the arena for O(1)-ish dot proximity queries.
//
// Dots are the only entities indexed here: they never move, so membership
// never needs re-bucketing. Movers and spawners live in plain vectors.

use glam::Vec2;

use crate::domain::entities::Dot;

#[derive(Debug)]
pub struct DotGrid {
    cols: usize,
    rows: usize,
    cell_w: f32,
    cell_h: f32,
    cells: Vec<Vec<Dot>>,
    len: usize,
}

impl DotGrid {
    pub fn new(width: f32, height: f32, cols: usize, rows: usize) -> Self {
        assert!(cols > 0 && rows > 0, "grid must have at least one cell");
        Self {
            cols,
            rows,
            cell_w: width / cols as f32,
            cell_h: height / rows as f32,
            cells: vec![Vec::new(); cols * rows],
            len: 0,
        }
    }

    /// Total number of indexed dots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_index(&self, pos: Vec2) -> usize {
        let col = (pos.x / self.cell_w).floor();
        let row = (pos.y / self.cell_h).floor();
        // Out-of-range positions are a caller bug, not a runtime condition.
        assert!(
            col >= 0.0 && (col as usize) < self.cols && row >= 0.0 && (row as usize) < self.rows,
            "position {pos:?} outside grid bounds"
        );
        col as usize * self.rows + row as usize
    }

    /// Inserts a dot into the cell covering its position.
    ///
    /// Panics if the position lies outside the grid; positions must be
    /// validated before insertion.
    pub fn insert(&mut self, dot: Dot) {
        let idx = self.cell_index(dot.circle.pos);
        self.cells[idx].push(dot);
        self.len += 1;
    }

    /// Removes a dot by id, using the position it was inserted with.
    ///
    /// Returns the removed dot, or `None` when no dot with that id lives in
    /// the computed cell.
    pub fn remove(&mut self, id: u64, pos: Vec2) -> Option<Dot> {
        let idx = self.cell_index(pos);
        let cell = &mut self.cells[idx];
        let slot = cell.iter().position(|d| d.id == id)?;
        self.len -= 1;
        Some(cell.swap_remove(slot))
    }

    /// Returns copies of every dot in the cells covered by the query
    /// rectangle, snapped outward to the enclosing grid lines.
    ///
    /// Each dot lives in exactly one cell, so duplicates are impossible.
    /// Cells outside the grid are skipped rather than asserted: queries are
    /// viewport-driven and routinely hang over the arena edge.
    pub fn query_region(&self, x: f32, y: f32, w: f32, h: f32) -> Vec<Dot> {
        let col_lo = (x / self.cell_w).floor() as i64;
        let row_lo = (y / self.cell_h).floor() as i64;
        let col_hi = ((x + w) / self.cell_w).ceil() as i64;
        let row_hi = ((y + h) / self.cell_h).ceil() as i64;

        let mut out = Vec::new();
        for col in col_lo..=col_hi {
            if col < 0 || col as usize >= self.cols {
                continue;
            }
            for row in row_lo..=row_hi {
                if row < 0 || row as usize >= self.rows {
                    continue;
                }
                out.extend_from_slice(&self.cells[col as usize * self.rows + row as usize]);
            }
        }
        out
    }
}
