//! Relief - a streaming heightfield terrain engine

pub mod core;
pub mod terrain;
pub mod mesh;
pub mod streaming;
pub mod decor;
