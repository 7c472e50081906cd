//! Named block palette: name/id mapping plus reference colors for image
//! drawing.
//!
//! IDs are small sequential values private to this server; they never cross
//! a binary protocol, so there is no mapping layer to keep in sync.

use ashlar_engine::world::block::BlockId;

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const GRASS: BlockId = BlockId(2);
pub const DIRT: BlockId = BlockId(3);
pub const COBBLESTONE: BlockId = BlockId(4);
pub const PLANKS: BlockId = BlockId(5);
pub const BEDROCK: BlockId = BlockId(7);
pub const WATER: BlockId = BlockId(8);
pub const LAVA: BlockId = BlockId(10);
pub const SAND: BlockId = BlockId(12);
pub const GRAVEL: BlockId = BlockId(13);
pub const LOG: BlockId = BlockId(17);
pub const LEAVES: BlockId = BlockId(18);
pub const GLASS: BlockId = BlockId(20);
pub const RED_WOOL: BlockId = BlockId(21);
pub const ORANGE_WOOL: BlockId = BlockId(22);
pub const YELLOW_WOOL: BlockId = BlockId(23);
pub const LIME_WOOL: BlockId = BlockId(24);
pub const GREEN_WOOL: BlockId = BlockId(25);
pub const TEAL_WOOL: BlockId = BlockId(26);
pub const AQUA_WOOL: BlockId = BlockId(27);
pub const CYAN_WOOL: BlockId = BlockId(28);
pub const BLUE_WOOL: BlockId = BlockId(29);
pub const INDIGO_WOOL: BlockId = BlockId(30);
pub const VIOLET_WOOL: BlockId = BlockId(31);
pub const MAGENTA_WOOL: BlockId = BlockId(32);
pub const PINK_WOOL: BlockId = BlockId(33);
pub const BLACK_WOOL: BlockId = BlockId(34);
pub const GRAY_WOOL: BlockId = BlockId(35);
pub const WHITE_WOOL: BlockId = BlockId(36);
pub const OBSIDIAN: BlockId = BlockId(49);

/// `(name, id, reference color)`. Color is `None` for blocks that should not
/// appear in image output (fluids, air).
const PALETTE: &[(&str, BlockId, Option<[u8; 3]>)] = &[
    ("air", AIR, None),
    ("stone", STONE, Some([128, 128, 128])),
    ("grass", GRASS, Some([94, 157, 52])),
    ("dirt", DIRT, Some([134, 96, 67])),
    ("cobblestone", COBBLESTONE, Some([100, 100, 100])),
    ("planks", PLANKS, Some([157, 128, 79])),
    ("bedrock", BEDROCK, Some([51, 51, 51])),
    ("water", WATER, None),
    ("lava", LAVA, None),
    ("sand", SAND, Some([218, 210, 158])),
    ("gravel", GRAVEL, Some([136, 126, 126])),
    ("log", LOG, Some([102, 81, 50])),
    ("leaves", LEAVES, Some([58, 95, 29])),
    ("glass", GLASS, None),
    ("red", RED_WOOL, Some([180, 45, 40])),
    ("orange", ORANGE_WOOL, Some([219, 125, 62])),
    ("yellow", YELLOW_WOOL, Some([222, 207, 42])),
    ("lime", LIME_WOOL, Some([123, 202, 37])),
    ("green", GREEN_WOOL, Some([57, 125, 50])),
    ("teal", TEAL_WOOL, Some([54, 117, 112])),
    ("aqua", AQUA_WOOL, Some([74, 180, 180])),
    ("cyan", CYAN_WOOL, Some([64, 142, 198])),
    ("blue", BLUE_WOOL, Some([53, 80, 184])),
    ("indigo", INDIGO_WOOL, Some([98, 62, 176])),
    ("violet", VIOLET_WOOL, Some([137, 62, 176])),
    ("magenta", MAGENTA_WOOL, Some([190, 73, 201])),
    ("pink", PINK_WOOL, Some([217, 130, 155])),
    ("black", BLACK_WOOL, Some([30, 27, 27])),
    ("gray", GRAY_WOOL, Some([100, 95, 95])),
    ("white", WHITE_WOOL, Some([222, 222, 222])),
    ("obsidian", OBSIDIAN, Some([26, 22, 38])),
];

/// Resolve a user-supplied block name (or raw numeric id) to a `BlockId`.
pub fn by_name(name: &str) -> Option<BlockId> {
    let lower = name.to_ascii_lowercase();
    if let Some((_, id, _)) = PALETTE.iter().find(|(n, _, _)| *n == lower) {
        return Some(*id);
    }
    lower.parse::<u8>().ok().map(BlockId)
}

/// Display name for a block id; raw number for ids outside the palette.
pub fn name_of(id: BlockId) -> String {
    match PALETTE.iter().find(|(_, pid, _)| *pid == id) {
        Some((name, _, _)) => (*name).to_string(),
        None => format!("#{}", id.0),
    }
}

/// Every palette block with a reference color, for nearest-color matching
/// when drawing images.
pub fn image_palette() -> Vec<(BlockId, [u8; 3])> {
    PALETTE
        .iter()
        .filter_map(|(_, id, color)| color.map(|c| (*id, c)))
        .collect()
}
