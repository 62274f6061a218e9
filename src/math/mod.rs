//! Conversion between world coordinates and editor display coordinates.
//!
//! The world is 32768 units across with the origin at the far corner: display
//! pixel 0 sits at world 32768 and each display pixel covers 4 world units.
//! Lights and EventPoints use the same mapping.

/// World units covered by one display pixel.
pub const WORLD_PER_PIXEL: i32 = 4;

/// World extent along each axis.
pub const WORLD_SIZE: i32 = 32768;

pub fn ui_to_world(px: i32) -> i32 {
    WORLD_SIZE - px * WORLD_PER_PIXEL
}

pub fn world_to_ui(w: i32) -> i32 {
    (WORLD_SIZE - w) / WORLD_PER_PIXEL
}

/// Convert a world (x, z) pair to display (px, py).
pub fn world_xz_to_ui(x: i32, z: i32) -> (i32, i32) {
    (world_to_ui(x), world_to_ui(z))
}

/// Convert a display (px, py) pair to world (x, z).
pub fn ui_to_world_xz(px: i32, py: i32) -> (i32, i32) {
    (ui_to_world(px), ui_to_world(py))
}
