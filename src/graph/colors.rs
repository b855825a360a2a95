//! Color palettes for the graph visualization
//!
//! Category fills for nodes, relation colors for edges, tier accents for
//! highlighted paths, and the panel/text colors used by the chrome.

use egui::Color32;

use super::types::Category;

// =============================================================================
// CATEGORY COLORS
// =============================================================================

/// Extra hues for categories outside the known set, picked by name hash
const OVERFLOW_PALETTE: [Color32; 8] = [
    Color32::from_rgb(244, 114, 182), // Pink-400
    Color32::from_rgb(45, 212, 191),  // Teal-400
    Color32::from_rgb(163, 230, 53),  // Lime-400
    Color32::from_rgb(251, 146, 60),  // Orange-400
    Color32::from_rgb(129, 140, 248), // Indigo-400
    Color32::from_rgb(232, 121, 249), // Fuchsia-400
    Color32::from_rgb(56, 189, 248),  // Sky-400
    Color32::from_rgb(250, 204, 21),  // Yellow-400
];

/// Fill color for a node category
pub fn category_fill(category: &Category) -> Color32 {
    match category {
        Category::Person => Color32::from_rgb(96, 165, 250),        // Blue-400
        Category::Organization => Color32::from_rgb(52, 211, 153),  // Emerald-400
        Category::Location => Color32::from_rgb(251, 191, 36),      // Amber-400
        Category::Concept => Color32::from_rgb(167, 139, 250),      // Violet-400
        Category::Event => Color32::from_rgb(248, 113, 113),        // Red-400
        Category::Product => Color32::from_rgb(251, 146, 60),       // Orange-400
        Category::Technology => Color32::from_rgb(34, 211, 238),    // Cyan-400
        Category::Document => Color32::from_rgb(148, 163, 184),     // Slate-400
        Category::Episodic => Color32::from_rgb(203, 213, 225),     // Slate-300
        Category::Requirement => Color32::from_rgb(244, 114, 182),  // Pink-400
        Category::Feature => Color32::from_rgb(74, 222, 128),       // Green-400
        Category::Module => Color32::from_rgb(129, 140, 248),       // Indigo-400
        Category::Entity => Color32::from_rgb(156, 163, 175),       // Gray-400
        Category::Other(name) => OVERFLOW_PALETTE[palette_slot(name, OVERFLOW_PALETTE.len())],
    }
}

/// Border color: the fill darkened
pub fn category_border(category: &Category) -> Color32 {
    darken(category_fill(category), 0.6)
}

/// FNV-1a over the name; stable across runs and platforms
fn palette_slot(name: &str, len: usize) -> usize {
    let hash = name
        .to_lowercase()
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    hash as usize % len
}

// =============================================================================
// RELATION COLORS
// =============================================================================

/// Generic edge color for relations outside the palette
pub const RELATION_FALLBACK: Color32 = Color32::from_rgb(148, 163, 184); // Slate-400

/// Edge color by relation display name
pub fn relation_color(relation: &str) -> Color32 {
    match relation.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
        "WORKS_FOR" | "EMPLOYED_BY" | "任职于" | "就职于" => Color32::from_rgb(59, 130, 246),
        "LOCATED_IN" | "BASED_IN" | "位于" => Color32::from_rgb(245, 158, 11),
        "PART_OF" | "MEMBER_OF" | "属于" => Color32::from_rgb(16, 185, 129),
        "MENTIONS" | "MENTIONED_IN" | "提及" => Color32::from_rgb(203, 213, 225),
        "BELONGS_TO" | "OWNED_BY" | "隶属于" => Color32::from_rgb(20, 184, 166),
        "CREATED_BY" | "AUTHORED_BY" | "创建" => Color32::from_rgb(236, 72, 153),
        "DEPENDS_ON" | "USES" | "依赖" => Color32::from_rgb(239, 68, 68),
        "HAS_FEATURE" | "IMPLEMENTS" | "包含" => Color32::from_rgb(132, 204, 22),
        "RELATED_TO" | "相关" => Color32::from_rgb(156, 163, 175),
        _ => RELATION_FALLBACK,
    }
}

// =============================================================================
// HIGHLIGHT TIERS
// =============================================================================

/// Shortest-path accent
pub const SHORTEST_PATH_COLOR: Color32 = Color32::from_rgb(251, 191, 36); // Amber-400

/// Highlight accent
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(59, 130, 246); // Blue-500

/// Ring drawn around the hovered node
pub fn hover_ring_color() -> Color32 {
    Color32::from_rgb(17, 24, 39)
}

// =============================================================================
// CHROME
// =============================================================================

pub fn canvas_background() -> Color32 {
    Color32::from_rgb(249, 250, 251)
}

pub fn panel_background() -> Color32 {
    Color32::from_rgba_unmultiplied(255, 255, 255, 235)
}

pub fn panel_border() -> Color32 {
    Color32::from_rgb(229, 231, 235)
}

pub fn label_text_color() -> Color32 {
    Color32::from_rgb(31, 41, 55)
}

pub fn secondary_text_color() -> Color32 {
    Color32::from_rgb(107, 114, 128)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Blend toward the color's own luminance. `amount` 0.0 keeps the color,
/// 1.0 yields grey. Alpha is preserved.
pub fn desaturate(color: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    let mix = |c: u8| (c as f32 + (luma - c as f32) * amount).round() as u8;
    Color32::from_rgba_unmultiplied(mix(r), mix(g), mix(b), a)
}

/// Scale RGB by `factor`
pub fn darken(color: Color32, factor: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let scale = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
    Color32::from_rgba_unmultiplied(scale(r), scale(g), scale(b), a)
}

/// Apply an opacity multiplier
pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}
