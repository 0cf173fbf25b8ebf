use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One of the eight grid directions. Rows grow southward, columns eastward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// North: previous row.
    N,
    /// South: next row.
    S,
    /// East: next column.
    E,
    /// West: previous column.
    W,
    /// North-east.
    NE,
    /// North-west.
    NW,
    /// South-east.
    SE,
    /// South-west.
    SW,
}

impl Direction {
    /// All directions, cardinals first.
    pub const ALL: [Direction; 8] = [
        Self::N,
        Self::S,
        Self::E,
        Self::W,
        Self::NE,
        Self::NW,
        Self::SE,
        Self::SW,
    ];

    /// The neighbour key: `n`, `s`, `e`, `w`, `ne`, `nw`, `se`, or `sw`.
    pub fn key(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::S => "s",
            Self::E => "e",
            Self::W => "w",
            Self::NE => "ne",
            Self::NW => "nw",
            Self::SE => "se",
            Self::SW => "sw",
        }
    }

    /// Parse a neighbour key.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }

    /// The direction pointing back.
    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::S => Self::N,
            Self::E => Self::W,
            Self::W => Self::E,
            Self::NE => Self::SW,
            Self::SW => Self::NE,
            Self::NW => Self::SE,
            Self::SE => Self::NW,
        }
    }

    /// Grid step as (row delta, column delta).
    pub fn offset(self) -> (isize, isize) {
        match self {
            Self::N => (-1, 0),
            Self::S => (1, 0),
            Self::E => (0, 1),
            Self::W => (0, -1),
            Self::NE => (-1, 1),
            Self::NW => (-1, -1),
            Self::SE => (1, 1),
            Self::SW => (1, -1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A directed neighbour link: `to` lies in direction `dir` from `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<T> {
    /// The slot the link starts at.
    pub from: T,
    /// Direction from `from` to `to`.
    pub dir: Direction,
    /// The neighbouring slot.
    pub to: T,
}

/// The cells along one diagonal of a grid.
///
/// Offset `k` selects the slots where `row - column == k`, walked from the
/// first row down. Offsets outside the grid yield nothing.
pub fn diagonal<'a, T, R>(rows: impl IntoIterator<Item = &'a R>, offset: isize) -> Vec<T>
where
    T: Copy + 'a,
    R: AsRef<[T]> + 'a + ?Sized,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(r, row)| {
            let row = row.as_ref();
            let c = r as isize - offset;
            (c >= 0 && (c as usize) < row.len()).then(|| row[c as usize])
        })
        .collect()
}

/// Compute every neighbour link of a rectangular grid, in both directions.
///
/// Horizontal pairs link `e`/`w`, vertical pairs `s`/`n`. Diagonals are
/// found by walking every offset from `-columns` to `rows`, once over the
/// rows top-down (`se`/`nw`) and once bottom-up (`ne`/`sw`), which covers
/// the partial diagonals in the corners.
pub fn neighbour_links<T: Copy>(grid: &[Vec<T>]) -> CoreResult<Vec<Link<T>>> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    if let Some((row, r)) = grid.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(CoreError::RaggedGrid {
            row,
            expected: cols,
            found: r.len(),
        });
    }

    let mut links = Vec::new();
    let mut pair = |a: T, dir: Direction, b: T| {
        links.push(Link { from: a, dir, to: b });
        links.push(Link {
            from: b,
            dir: dir.opposite(),
            to: a,
        });
    };

    // West and east
    for row in grid {
        for w in row.windows(2) {
            pair(w[0], Direction::E, w[1]);
        }
    }

    // North and south
    for c in 0..cols {
        for r in 1..rows {
            pair(grid[r - 1][c], Direction::S, grid[r][c]);
        }
    }

    for offset in -(cols as isize)..(rows as isize) {
        // Northwest and southeast
        for w in diagonal(grid.iter(), offset).windows(2) {
            pair(w[0], Direction::SE, w[1]);
        }
        // Southwest and northeast
        for w in diagonal(grid.iter().rev(), offset).windows(2) {
            pair(w[0], Direction::NE, w[1]);
        }
    }

    Ok(links)
}

/// One slot of a level grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    /// Extra whitespace-separated tags for the cell.
    #[serde(default)]
    pub tags: String,
    /// Visual mesh resource for the cell's terrain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
}

/// The layout a world's cell grid is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Spacing between cell origins in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Rows of cells, north to south.
    pub rows: Vec<Vec<CellSpec>>,
}

fn default_cell_size() -> f32 {
    512.0
}

impl GridLayout {
    /// A `rows` × `cols` layout of plain cells.
    pub fn uniform(rows: usize, cols: usize, cell_size: f32) -> Self {
        Self {
            cell_size,
            rows: vec![vec![CellSpec::default(); cols]; rows],
        }
    }
}
