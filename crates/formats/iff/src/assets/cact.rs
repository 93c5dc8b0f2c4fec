use std::fmt;

use crate::cursor::{
    read_i16_at, read_i32_at, read_signature_at, read_u32_at, write_u16_at, write_u32_at,
};
use crate::error::Result;
use crate::tag::{display_signature, ChunkTag};

use super::sub_chunks;

const ID_OFFSET: usize = 8;
const TYPE_OFFSET: usize = 12;
const Y_OFFSET: usize = 16;
const X_OFFSET: usize = 24;
/// Rotation of actor types 8 and 36, repeated at [`MIRRORED_ROTATION_OFFSET`].
const ROTATION_OFFSET: usize = 64;
const MIRRORED_ROTATION_OFFSET: usize = 78;
/// Rotation of actor type 11.
const TURRET_ROTATION_OFFSET: usize = 46;
/// `aRSL` tag, size and one unknown field before the references.
const REFERENCES_OFFSET: usize = 12;
const REFERENCE_SIZE: usize = 8;

/// A reference from an actor to another asset, as listed in `aRSL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectReference {
    /// Raw on-disk tag bytes.
    pub signature: [u8; 4],
    pub id: u32,
}

impl ObjectReference {
    pub fn tag(&self) -> Option<ChunkTag> {
        ChunkTag::from_signature(&self.signature)
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", display_signature(&self.signature), self.id)
    }
}

/// A placed actor (`Cact`, or `Csac` for scripted actors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRecord {
    bytes: Vec<u8>,
    pub id: u32,
    pub actor_type: u32,
    pub y: i32,
    pub x: i32,
    /// Facing, for the actor types that store one.
    pub rotation: Option<i16>,
    pub references: Vec<ObjectReference>,
    /// Whether a `tSAC` script block follows the actor.
    pub is_scripted: bool,
}

impl ActorRecord {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let actor_type = read_u32_at(data, TYPE_OFFSET)?;
        let rotation = match actor_type {
            8 | 36 => Some(read_i16_at(data, ROTATION_OFFSET)?),
            11 => Some(read_i16_at(data, TURRET_ROTATION_OFFSET)?),
            _ => None,
        };

        let records = sub_chunks(data, &[ChunkTag::TAct, ChunkTag::ARsl, ChunkTag::TSac]);
        let mut references = Vec::new();
        for rsl in records.iter().filter(|c| c.tag == ChunkTag::ARsl) {
            let count = rsl.size.saturating_sub(REFERENCES_OFFSET) / REFERENCE_SIZE;
            for i in 0..count {
                let at = rsl.offset + REFERENCES_OFFSET + i * REFERENCE_SIZE;
                references.push(ObjectReference {
                    signature: read_signature_at(data, at)?,
                    id: read_u32_at(data, at + 4)?,
                });
            }
        }

        Ok(Self {
            bytes: data.to_vec(),
            id: read_u32_at(data, ID_OFFSET)?,
            actor_type,
            y: read_i32_at(data, Y_OFFSET)?,
            x: read_i32_at(data, X_OFFSET)?,
            rotation,
            references,
            is_scripted: records.iter().any(|c| c.tag == ChunkTag::TSac),
        })
    }

    /// Serialize the actor with its position and rotation written back.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.bytes.clone();
        write_u32_at(&mut out, Y_OFFSET, self.y as u32)?;
        write_u32_at(&mut out, X_OFFSET, self.x as u32)?;
        if let Some(rotation) = self.rotation {
            let rotation = rotation as u16;
            if self.actor_type == 11 {
                write_u16_at(&mut out, TURRET_ROTATION_OFFSET, rotation)?;
            } else {
                write_u16_at(&mut out, ROTATION_OFFSET, rotation)?;
                write_u16_at(&mut out, MIRRORED_ROTATION_OFFSET, rotation)?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A resupply actor in the layout the game uses for scripted pickups.
    fn scripted_actor(id: u32, x: i32, y: i32) -> Vec<u8> {
        let mut act = ChunkTag::TAct.signature().to_vec();
        act.extend(68u32.to_le_bytes());
        act.extend(id.to_le_bytes());
        act.extend(16u32.to_le_bytes());
        act.extend(y.to_le_bytes());
        act.extend([0; 4]);
        act.extend(x.to_le_bytes());
        act.resize(68, 0);

        let mut rsl = ChunkTag::ARsl.signature().to_vec();
        rsl.extend(28u32.to_le_bytes());
        rsl.extend(id.to_le_bytes());
        rsl.extend(ChunkTag::Cobj.signature());
        rsl.extend(24u32.to_le_bytes());
        rsl.extend(ChunkTag::Null.signature());
        rsl.extend(0u32.to_le_bytes());

        let mut sac = ChunkTag::TSac.signature().to_vec();
        sac.extend(48u32.to_le_bytes());
        sac.resize(48, 0);

        [act, rsl, sac].concat()
    }

    #[test]
    fn parses_scripted_actor() {
        let data = scripted_actor(5, -300, 1200);
        let actor = ActorRecord::parse(&data).unwrap();
        assert_eq!(actor.id, 5);
        assert_eq!(actor.actor_type, 16);
        assert_eq!((actor.x, actor.y), (-300, 1200));
        assert_eq!(actor.rotation, None);
        assert!(actor.is_scripted);
        assert_eq!(actor.references.len(), 2);
        assert_eq!(actor.references[0].tag(), Some(ChunkTag::Cobj));
        assert_eq!(actor.references[0].id, 24);
        assert_eq!(actor.references[1].to_string(), "NULL 0");
        assert_eq!(actor.to_bytes().unwrap(), data);
    }

    #[test]
    fn rotation_is_mirrored() {
        let mut data = scripted_actor(1, 0, 0);
        data[TYPE_OFFSET..TYPE_OFFSET + 4].copy_from_slice(&8u32.to_le_bytes());
        let mut actor = ActorRecord::parse(&data).unwrap();
        assert_eq!(actor.rotation, Some(0));
        actor.rotation = Some(-1024);
        actor.x = 77;
        let out = actor.to_bytes().unwrap();
        assert_eq!(read_i16_at(&out, ROTATION_OFFSET).unwrap(), -1024);
        assert_eq!(read_i16_at(&out, MIRRORED_ROTATION_OFFSET).unwrap(), -1024);
        assert_eq!(read_u32_at(&out, X_OFFSET).unwrap(), 77);
    }
}
