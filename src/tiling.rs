//! Density-driven tile grid computation.
//!
//! The density level (1-5) is a UX knob, not a literal tile count. Counts
//! come from a weighted blend of the region's capacity: at density 1 the
//! grid is a sparse covering, at density 5 a dense one, and `max(1, ..)`
//! keeps the grid non-empty even when one item is larger than the region.

use crate::params::MAX_DENSITY_LEVEL;

/// How a tile's offset anchors the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAnchor {
    /// Offsets point at the text baseline; the vertical leading offset
    /// includes one item height so the first row's glyph box stays inside
    /// the region.
    Baseline,
    /// Offsets point at the item's top-left corner (picture tiles).
    TopLeft,
}

/// A computed tile grid; derived per render call and discarded after use.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    pub leading_x: f64,
    pub leading_y: f64,
    pub spacing_x: f64,
    pub spacing_y: f64,
    item_width: f64,
    item_height: f64,
}

impl TileGrid {
    /// Compute the grid for a drawable region, an item size, and a density
    /// level in 1..=5.
    pub fn compute(
        region_width: f64,
        region_height: f64,
        item_width: f64,
        item_height: f64,
        density_level: u8,
        anchor: TileAnchor,
    ) -> Self {
        // Degenerate items (zero-width text, zero-sized images) would blow
        // the capacity up to infinity.
        let item_width = item_width.max(1.0);
        let item_height = item_height.max(1.0);

        let density = density_level as f64 / MAX_DENSITY_LEVEL as f64;
        let horizontal_capacity = region_width / item_width;
        let vertical_capacity = region_height / item_height;

        let columns = (horizontal_capacity * 0.2 + horizontal_capacity * 0.6 * density)
            .round()
            .max(1.0) as u32;
        let rows = (vertical_capacity * 0.1 + vertical_capacity * 0.3 * density)
            .round()
            .max(1.0) as u32;

        let spacing_x = (region_width - columns as f64 * item_width) / columns as f64;
        let spacing_y = (region_height - rows as f64 * item_height) / rows as f64;

        let leading_x = spacing_x / 2.0;
        let leading_y = match anchor {
            TileAnchor::Baseline => item_height + spacing_y / 2.0,
            TileAnchor::TopLeft => spacing_y / 2.0,
        };

        Self {
            columns,
            rows,
            leading_x,
            leading_y,
            spacing_x,
            spacing_y,
            item_width,
            item_height,
        }
    }

    /// Anchor offset of the cell at `(column, row)`, 0-indexed.
    pub fn offset(&self, column: u32, row: u32) -> (f64, f64) {
        (
            self.leading_x + column as f64 * (self.item_width + self.spacing_x),
            self.leading_y + row as f64 * (self.item_height + self.spacing_y),
        )
    }

    /// Anchor offsets of every cell, row-major.
    pub fn offsets(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.columns).map(move |column| self.offset(column, row)))
    }

    /// Total number of cells.
    pub fn tile_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }
}
