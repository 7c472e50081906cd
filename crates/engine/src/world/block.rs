/// Opaque block identifier. One byte, matching the BlockDB entry schema.
///
/// The engine attaches no meaning to values other than `AIR`; names, colors,
/// and physics predicates live in the server crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);

    pub const fn new(raw: u8) -> Self {
        BlockId(raw)
    }
}
