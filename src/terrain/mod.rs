//! Procedural heightfield generation and vertex coloring

pub mod heightfield;
pub use heightfield::{HeightField, OctaveParams};

pub mod palette;
pub use palette::{HeightPalette, HeightRamp, PaletteConfig};
