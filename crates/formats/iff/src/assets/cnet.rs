use log::warn;

use crate::cursor::{read_i16_at, read_u16_at, slice_at, Writer};
use crate::error::Result;

use super::patch_total_size;

const NODE_COUNT_OFFSET: usize = 14;
const NODES_OFFSET: usize = 16;
const NODE_SIZE: usize = 12;

/// One navigation node of a `Cnet` path graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    raw: [u8; NODE_SIZE],
    /// Index of the node this one links to, when the link field encodes one.
    pub next: Option<u16>,
    pub x: i16,
    pub y: i16,
    pub is_start: bool,
}

impl PathNode {
    /// A new node with the unknown fields set the way the game writes them.
    pub fn new(next: Option<u16>, x: i16, y: i16, is_start: bool) -> Self {
        let mut raw = [0u8; NODE_SIZE];
        raw[4..6].copy_from_slice(&[0xC0, 0xFF]);
        Self {
            raw,
            next,
            x,
            y,
            is_start,
        }
    }

    fn parse(raw: [u8; NODE_SIZE]) -> Result<Self> {
        let link = read_i16_at(&raw, 2)?;
        Ok(Self {
            raw,
            next: decode_link(link),
            x: read_i16_at(&raw, 6)?,
            y: read_i16_at(&raw, 8)?,
            is_start: read_u16_at(&raw, 10)? == 1,
        })
    }

    fn write(&self, w: &mut Writer) {
        w.write_bytes(&self.raw[0..2]);
        match self.next {
            Some(next) => w.write_i16(encode_link(next)),
            None => w.write_bytes(&self.raw[2..4]),
        }
        w.write_bytes(&self.raw[4..6]);
        w.write_i16(self.x);
        w.write_i16(self.y);
        w.write_u16(u16::from(self.is_start));
    }
}

/// Links are stored as `index * 64 + 63`; other values are not links.
fn decode_link(link: i16) -> Option<u16> {
    let v = i32::from(link) - 63;
    if v >= 0 && v % 64 == 0 {
        u16::try_from(v / 64).ok()
    } else {
        None
    }
}

fn encode_link(next: u16) -> i16 {
    (i32::from(next) * 64 + 63) as i16
}

/// A navigation graph (`Cnet`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGraph {
    header: Vec<u8>,
    pub nodes: Vec<PathNode>,
    /// Bytes after the last whole node record.
    trailer: Vec<u8>,
}

impl PathGraph {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = slice_at(data, 0, NODE_COUNT_OFFSET)?.to_vec();
        let declared = read_u16_at(data, NODE_COUNT_OFFSET)? as usize;

        let records = &data[NODES_OFFSET..];
        let mut nodes = Vec::with_capacity(records.len() / NODE_SIZE);
        for chunk in records.chunks_exact(NODE_SIZE) {
            let mut raw = [0u8; NODE_SIZE];
            raw.copy_from_slice(chunk);
            nodes.push(PathNode::parse(raw)?);
        }
        if nodes.len() != declared {
            warn!(
                "path graph declares {declared} nodes but holds {}",
                nodes.len()
            );
        }
        let trailer = records.chunks_exact(NODE_SIZE).remainder().to_vec();
        Ok(Self {
            header,
            nodes,
            trailer,
        })
    }

    /// Serialize the graph, updating the node count and size fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w =
            Writer::with_capacity(NODES_OFFSET + self.nodes.len() * NODE_SIZE + self.trailer.len());
        w.write_bytes(&self.header);
        w.write_u16(self.nodes.len() as u16);
        for node in &self.nodes {
            node.write(&mut w);
        }
        w.write_bytes(&self.trailer);
        let mut out = w.into_bytes();
        patch_total_size(&mut out)?;
        Ok(out)
    }
}
