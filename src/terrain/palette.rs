//! Height-based vertex coloring
//!
//! Every generated vertex gets a color from its height: a flat underwater
//! color below the water level, otherwise a keyframed gradient evaluated at
//! the height's fraction of the configured [min, max] range.

use serde::{Deserialize, Serialize};

/// Keyframe-based color ramp over a normalized 0..1 height fraction.
///
/// Keys are `(fraction, rgb)` pairs sorted by fraction. Sampling clamps to
/// the first/last key outside the keyed range.
#[derive(Clone, Debug)]
pub struct HeightRamp {
    keys: Vec<(f32, [f32; 3])>,
}

impl HeightRamp {
    /// Create a new ramp from unsorted keys. Keys are sorted by fraction.
    pub fn new(mut keys: Vec<(f32, [f32; 3])>) -> Self {
        keys.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sample the ramp at fraction `t`, clamped to the keyed range.
    pub fn sample(&self, t: f32) -> [f32; 3] {
        assert!(!self.keys.is_empty(), "HeightRamp must have at least one key");

        let n = self.keys.len();
        if t <= self.keys[0].0 {
            return self.keys[0].1;
        }
        if t >= self.keys[n - 1].0 {
            return self.keys[n - 1].1;
        }

        // First key with fraction > t; t is between keys[idx-1] and keys[idx]
        let idx = self.keys.iter().position(|k| k.0 > t).unwrap_or(n - 1);
        let (t_a, a) = self.keys[idx - 1];
        let (t_b, b) = self.keys[idx];
        let span = t_b - t_a;
        if span < 1e-6 {
            return a;
        }
        let frac = (t - t_a) / span;
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
        ]
    }
}

impl Serialize for HeightRamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeightRamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<(f32, [f32; 3])>::deserialize(deserializer)?;
        Ok(Self::new(keys))
    }
}

/// Vertex color configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Heights below this get the flat underwater color
    pub water_level: f32,
    /// Flat color for submerged vertices (linear RGB)
    pub underwater: [f32; 3],
    /// Height mapped to ramp fraction 0.0
    pub min_height: f32,
    /// Height mapped to ramp fraction 1.0
    pub max_height: f32,
    /// Above-water gradient keyed by height fraction
    pub ramp: HeightRamp,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            water_level: 4.0,
            underwater: [0.72, 0.67, 0.45],
            min_height: 0.0,
            max_height: 100.0,
            ramp: HeightRamp::new(vec![
                (0.00, [0.76, 0.70, 0.50]), // sand
                (0.07, [0.35, 0.55, 0.25]), // grass
                (0.35, [0.26, 0.42, 0.19]), // dark grass
                (0.60, [0.45, 0.42, 0.40]), // rock
                (0.80, [0.85, 0.86, 0.88]), // scree
                (1.00, [0.97, 0.97, 1.00]), // snow
            ]),
        }
    }
}

/// Height-to-color evaluator built from a [`PaletteConfig`].
pub struct HeightPalette {
    config: PaletteConfig,
}

impl HeightPalette {
    pub fn new(config: PaletteConfig) -> Self {
        Self { config }
    }

    /// Color (linear RGB) for a vertex at the given height.
    pub fn color_at(&self, height: f32) -> [f32; 3] {
        let c = &self.config;
        if height < c.water_level {
            return c.underwater;
        }
        let span = c.max_height - c.min_height;
        let t = if span.abs() < 1e-6 {
            0.0
        } else {
            ((height - c.min_height) / span).clamp(0.0, 1.0)
        };
        c.ramp.sample(t)
    }

    pub fn water_level(&self) -> f32 {
        self.config.water_level
    }
}
