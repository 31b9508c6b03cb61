//! River and coastline detection.
//!
//! Both passes run over a [`TerrainWindow`]: the chunk plus an apron of
//! surrounding tiles sampled in world space. Coast checks on border tiles
//! see their neighbours in the adjacent chunk.
//!
//! Whether a tile carries a river depends only on the world: a river is the
//! steepest-descent path of a hashed source tile, and a source counts only
//! if its path ends in water or a basin within `max_length` tiles. With an
//! apron of [`RiverParams::window_apron`] every chunk sees all sources that
//! can reach it, so rivers run on unbroken across chunk borders.

use serde::{Deserialize, Serialize};
use tileworld_common::{ChunkCoord, TilePos};

use crate::grid::Grid;
use crate::noise::tile_hash;

/// Neighbour offsets, in the fixed order used for steepest-descent ties.
const NEIGHBOURS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// River source and tracing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverParams {
    /// Minimum height of a river source.
    pub source_height: f64,
    /// Minimum moisture of a river source.
    pub source_moisture: f64,
    /// One in `rarity` eligible tiles becomes a source.
    pub rarity: u64,
    /// Paths shorter than this that never reach water are dropped.
    pub min_length: usize,
    /// Sources whose path does not end within this many tiles are dropped.
    pub max_length: usize,
}

impl Default for RiverParams {
    fn default() -> Self {
        Self {
            source_height: 0.58,
            source_moisture: 0.5,
            rarity: 40,
            min_length: 4,
            max_length: 32,
        }
    }
}

impl RiverParams {
    /// Apron a window needs for its river flags to be exact.
    ///
    /// A river tile lies at most `max_length - 1` steps below its source,
    /// and the source's whole path is checked, so the window has to reach
    /// twice that far plus the neighbours of the last tile.
    #[must_use]
    pub fn window_apron(&self) -> u32 {
        u32::try_from(2 * self.max_length.max(1) + 1).unwrap_or(u32::MAX)
    }
}

/// A contiguous run of river tiles inside one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiverSegment {
    /// Local tiles in downstream order.
    pub tiles: Vec<TilePos>,
    /// Whether the river flows in from outside the chunk.
    pub enters_from_edge: bool,
    /// Whether the river ends in water inside this segment.
    pub reaches_water: bool,
}

impl RiverSegment {
    /// Number of tiles in the segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the segment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Heights and moisture of a chunk and its apron.
#[derive(Debug, Clone)]
pub struct TerrainWindow {
    origin_x: i64,
    origin_y: i64,
    side: usize,
    apron: usize,
    chunk_size: usize,
    height: Vec<f64>,
    moisture: Vec<f64>,
}

impl TerrainWindow {
    /// Samples `(height, moisture)` for every tile of the chunk and its apron.
    pub fn sample(
        chunk: ChunkCoord,
        chunk_size: u32,
        apron: u32,
        mut sample: impl FnMut(i64, i64) -> (f64, f64),
    ) -> Self {
        let origin = chunk.to_world_coord(chunk_size);
        let apron = apron as usize;
        let chunk_size = chunk_size as usize;
        let side = chunk_size + 2 * apron;
        let origin_x = origin.x - apron as i64;
        let origin_y = origin.y - apron as i64;

        let mut height = Vec::with_capacity(side * side);
        let mut moisture = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                let (h, m) = sample(origin_x + col as i64, origin_y + row as i64);
                height.push(h);
                moisture.push(m);
            }
        }

        Self {
            origin_x,
            origin_y,
            side,
            apron,
            chunk_size,
            height,
            moisture,
        }
    }

    fn index(&self, wx: i64, wy: i64) -> Option<usize> {
        let col = usize::try_from(wx - self.origin_x).ok()?;
        let row = usize::try_from(wy - self.origin_y).ok()?;
        (col < self.side && row < self.side).then_some(row * self.side + col)
    }

    fn world_of(&self, index: usize) -> (i64, i64) {
        (
            self.origin_x + (index % self.side) as i64,
            self.origin_y + (index / self.side) as i64,
        )
    }

    /// Height at a world tile, if it lies inside the window.
    #[must_use]
    pub fn height_at(&self, wx: i64, wy: i64) -> Option<f64> {
        self.index(wx, wy).map(|i| self.height[i])
    }

    /// Chebyshev distance of a window index from the chunk, in tiles.
    fn chunk_distance(&self, index: usize) -> usize {
        let axis = |v: usize| {
            if v < self.apron {
                self.apron - v
            } else {
                v.saturating_sub(self.apron + self.chunk_size - 1)
            }
        };
        axis(index % self.side).max(axis(index / self.side))
    }

    /// Local position of a window index, if it lies inside the chunk.
    fn local(&self, index: usize) -> Option<TilePos> {
        let col = (index % self.side).checked_sub(self.apron)?;
        let row = (index / self.side).checked_sub(self.apron)?;
        (col < self.chunk_size && row < self.chunk_size)
            .then(|| TilePos::new(col as u32, row as u32))
    }

    /// World coordinate of a local chunk tile.
    #[must_use]
    pub fn world_of_local(&self, pos: TilePos) -> (i64, i64) {
        (
            self.origin_x + (self.apron as i64) + i64::from(pos.x),
            self.origin_y + (self.apron as i64) + i64::from(pos.y),
        )
    }
}

/// Rivers found in one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverMap {
    /// Per-tile river flag for the chunk.
    pub is_river: Grid<bool>,
    /// In-chunk segments, in source scan order.
    pub segments: Vec<RiverSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathEnd {
    /// The next step is into water.
    Water,
    /// No strictly lower neighbour.
    Basin,
    /// Left the window or ran past `max_length`.
    Unresolved,
}

struct Path {
    tiles: Vec<usize>,
    end: PathEnd,
}

impl Path {
    fn qualifies(&self, min_length: usize) -> bool {
        match self.end {
            PathEnd::Water => true,
            PathEnd::Basin => self.tiles.len() >= min_length,
            PathEnd::Unresolved => false,
        }
    }
}

enum Step {
    Down(usize),
    Basin,
    Edge,
}

/// Traces steepest-descent rivers over the window.
///
/// Sources are scanned row-major. Each path walks to the lowest strictly
/// lower 4-neighbour, ties going to the first in N, E, S, W order, until
/// the next step would enter water or no lower neighbour exists. Paths of
/// later sources that join an earlier river add no segment for the shared
/// tiles.
#[must_use]
pub fn trace_rivers(
    window: &TerrainWindow,
    sea_level: f64,
    mountain_level: f64,
    params: &RiverParams,
    seed: u64,
) -> RiverMap {
    let size = window.chunk_size as u32;
    let rarity = params.rarity.max(1);
    let max_length = params.max_length.max(1);
    let mut claimed = vec![false; window.height.len()];
    let mut is_river = Grid::filled(size, false);
    let mut segments = Vec::new();

    for source in 0..window.height.len() {
        let h = window.height[source];
        if window.chunk_distance(source) >= max_length
            || h < params.source_height
            || h >= mountain_level
            || h < sea_level
            || window.moisture[source] < params.source_moisture
        {
            continue;
        }
        let (wx, wy) = window.world_of(source);
        if tile_hash(seed, wx, wy) % rarity != 0 {
            continue;
        }

        let path = descend(window, source, sea_level, max_length);
        if !path.qualifies(params.min_length) {
            continue;
        }

        for &tile in &path.tiles {
            if let Some(pos) = window.local(tile) {
                is_river[pos] = true;
            }
        }
        segments.extend(split_segments(window, &path, &mut claimed));
    }

    RiverMap { is_river, segments }
}

fn downhill(window: &TerrainWindow, index: usize) -> Step {
    let (wx, wy) = window.world_of(index);
    let mut lowest: Option<(usize, f64)> = None;

    for (dx, dy) in NEIGHBOURS {
        let Some(n) = window.index(wx + dx, wy + dy) else {
            return Step::Edge;
        };
        let nh = window.height[n];
        if lowest.map_or(true, |(_, best)| nh < best) {
            lowest = Some((n, nh));
        }
    }

    match lowest {
        Some((n, nh)) if nh < window.height[index] => Step::Down(n),
        _ => Step::Basin,
    }
}

fn descend(window: &TerrainWindow, source: usize, sea_level: f64, max_length: usize) -> Path {
    let mut tiles = vec![source];
    let mut current = source;

    let end = loop {
        match downhill(window, current) {
            Step::Edge => break PathEnd::Unresolved,
            Step::Basin => break PathEnd::Basin,
            Step::Down(next) if window.height[next] < sea_level => break PathEnd::Water,
            Step::Down(next) => {
                if tiles.len() == max_length {
                    break PathEnd::Unresolved;
                }
                tiles.push(next);
                current = next;
            },
        }
    };

    Path { tiles, end }
}

/// Splits a path into runs of chunk tiles no earlier river has claimed.
fn split_segments(
    window: &TerrainWindow,
    path: &Path,
    claimed: &mut [bool],
) -> Vec<RiverSegment> {
    let mut segments = Vec::new();
    let mut current: Option<RiverSegment> = None;
    let last = path.tiles.len().saturating_sub(1);

    for (i, &tile) in path.tiles.iter().enumerate() {
        let fresh = !std::mem::replace(&mut claimed[tile], true);
        match window.local(tile).filter(|_| fresh) {
            Some(pos) => {
                let segment = current.get_or_insert_with(|| RiverSegment {
                    tiles: Vec::new(),
                    enters_from_edge: i > 0 && window.local(path.tiles[i - 1]).is_none(),
                    reaches_water: false,
                });
                segment.tiles.push(pos);
                if i == last {
                    segment.reaches_water = path.end == PathEnd::Water;
                }
            },
            None => segments.extend(current.take()),
        }
    }
    segments.extend(current);
    segments
}

/// Land tiles of the chunk that are 4-adjacent to water, in row-major order.
#[must_use]
pub fn find_coasts(window: &TerrainWindow, sea_level: f64) -> Vec<TilePos> {
    let size = window.chunk_size as u32;
    let mut coasts = Vec::new();

    for row in 0..size {
        for col in 0..size {
            let pos = TilePos::new(col, row);
            let (wx, wy) = window.world_of_local(pos);
            let Some(h) = window.height_at(wx, wy) else {
                continue;
            };
            if h < sea_level {
                continue;
            }
            let touches_water = NEIGHBOURS.iter().any(|&(dx, dy)| {
                window
                    .height_at(wx + dx, wy + dy)
                    .is_some_and(|nh| nh < sea_level)
            });
            if touches_water {
                coasts.push(pos);
            }
        }
    }
    coasts
}
