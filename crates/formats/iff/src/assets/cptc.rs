use crate::cursor::{read_u32_at, slice_at, write_u32_at, Writer};
use crate::error::{Error, Result};

use super::patch_total_size;

const WIDTH_OFFSET: usize = 16;
const HEIGHT_OFFSET: usize = 20;
const BORDER_OFFSET: usize = 36;
const GRID_OFFSET: usize = 48;

/// The map's tile layout (`Cptc`): a `width` x `height` grid of tile
/// indices into the `Ctil` assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    header: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Number of border rows around the playable area.
    pub border: u32,
    /// Row-major tile indices.
    pub tiles: Vec<u32>,
}

impl TileLayout {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = slice_at(data, 0, GRID_OFFSET)?.to_vec();
        let width = read_u32_at(data, WIDTH_OFFSET)?;
        let height = read_u32_at(data, HEIGHT_OFFSET)?;
        let border = read_u32_at(data, BORDER_OFFSET)?;

        let cells = width as usize * height as usize;
        let grid = &data[GRID_OFFSET..];
        if grid.len() != cells * 4 {
            return Err(Error::SizeMismatch {
                context: "tile grid",
                expected: cells * 4,
                found: grid.len(),
            });
        }
        // Stored values are byte offsets into a table of 4-byte entries.
        let tiles = grid
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) / 4)
            .collect();

        Ok(Self {
            header,
            width,
            height,
            border,
            tiles,
        })
    }

    /// Rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.tiles.chunks(self.width.max(1) as usize)
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize).copied()
    }

    pub fn set_tile(&mut self, x: u32, y: u32, tile: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        match self.tiles.get_mut((y * self.width + x) as usize) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    /// Serialize the layout, updating the dimension and size fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let cells = self.width as usize * self.height as usize;
        if self.tiles.len() != cells {
            return Err(Error::SizeMismatch {
                context: "tile grid",
                expected: cells,
                found: self.tiles.len(),
            });
        }
        let mut w = Writer::with_capacity(GRID_OFFSET + cells * 4);
        w.write_bytes(&self.header);
        for &tile in &self.tiles {
            w.write_u32(tile * 4);
        }
        let mut out = w.into_bytes();
        write_u32_at(&mut out, WIDTH_OFFSET, self.width)?;
        write_u32_at(&mut out, HEIGHT_OFFSET, self.height)?;
        patch_total_size(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0u8; GRID_OFFSET];
        data[WIDTH_OFFSET..WIDTH_OFFSET + 4].copy_from_slice(&width.to_le_bytes());
        data[HEIGHT_OFFSET..HEIGHT_OFFSET + 4].copy_from_slice(&height.to_le_bytes());
        data[BORDER_OFFSET] = 2;
        for i in 0..width * height {
            data.extend_from_slice(&(i * 4).to_le_bytes());
        }
        let len = data.len() as u32;
        data[4..8].copy_from_slice(&len.to_le_bytes());
        data
    }

    #[test]
    fn parses_grid() {
        let data = layout(3, 2);
        let map = TileLayout::parse(&data).unwrap();
        assert_eq!((map.width, map.height, map.border), (3, 2, 2));
        let rows: Vec<_> = map.rows().collect();
        assert_eq!(rows, [&[0, 1, 2][..], &[3, 4, 5][..]]);
        assert_eq!(map.tile(2, 1), Some(5));
        assert_eq!(map.tile(3, 0), None);
        assert_eq!(map.to_bytes().unwrap(), data);
    }

    #[test]
    fn edit_and_resize() {
        let mut map = TileLayout::parse(&layout(2, 2)).unwrap();
        assert!(map.set_tile(1, 1, 9));
        map.width = 3;
        assert!(map.to_bytes().is_err());
        map.tiles.extend([7, 7]);
        let bytes = map.to_bytes().unwrap();
        assert_eq!(read_u32_at(&bytes, 4).unwrap() as usize, bytes.len());
        let again = TileLayout::parse(&bytes).unwrap();
        assert_eq!(again.width, 3);
        assert_eq!(again.tiles, [0, 1, 2, 9, 7, 7]);
    }

    #[test]
    fn grid_must_match_dimensions() {
        let mut data = layout(2, 2);
        data.truncate(data.len() - 4);
        assert!(matches!(
            TileLayout::parse(&data),
            Err(Error::SizeMismatch { expected: 16, found: 12, .. })
        ));
    }
}
