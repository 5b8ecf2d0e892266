//! Configuration persistence for mapmeasure settings

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{CIRCLE_SIDES, MeasureKind};

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }
}

impl ShapeColor {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

/// How measurements are drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureStyle {
    /// Outline of lines, areas and circles
    pub stroke: ShapeColor,
    pub stroke_width: f32,
    /// Inside of areas and circles
    pub fill: ShapeColor,
    /// Radius of hover and center dots in pixels
    pub point_radius: f32,
    pub point_outline: ShapeColor,
    pub point_outline_width: f32,
    pub label_text: ShapeColor,
    /// Halo drawn around label text
    pub label_outline: ShapeColor,
    pub label_outline_width: f32,
}

impl Default for MeasureStyle {
    fn default() -> Self {
        let white = ShapeColor::rgb(1.0, 1.0, 1.0);
        Self {
            stroke: ShapeColor::default(),
            stroke_width: 2.0,
            fill: ShapeColor::default().with_alpha(0.1),
            point_radius: 7.0,
            point_outline: white,
            point_outline_width: 2.0,
            // #333
            label_text: ShapeColor::rgb(0.2, 0.2, 0.2),
            label_outline: white,
            label_outline_width: 3.0,
        }
    }
}

/// Popup title per measurement kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupTitles {
    pub distance: String,
    pub area: String,
    pub radius: String,
    pub angle: String,
}

impl Default for PopupTitles {
    fn default() -> Self {
        Self {
            distance: MeasureKind::Distance.default_title().to_string(),
            area: MeasureKind::Area.default_title().to_string(),
            radius: MeasureKind::Radius.default_title().to_string(),
            angle: MeasureKind::Angle.default_title().to_string(),
        }
    }
}

impl PopupTitles {
    pub fn title(&self, kind: MeasureKind) -> &str {
        match kind {
            MeasureKind::Distance => &self.distance,
            MeasureKind::Area => &self.area,
            MeasureKind::Radius => &self.radius,
            MeasureKind::Angle => &self.angle,
        }
    }
}

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub style: MeasureStyle,
    pub titles: PopupTitles,
    /// Sides of the polygon used when circles are approximated
    pub circle_sides: usize,
    /// Draw radius measurements as polygons instead of native circles
    pub approximate_circles: bool,
    /// Show the running value next to the sketch
    pub live_labels: bool,
    /// Dot under the pointer before the first radius/angle click
    pub hover_marker: bool,
    /// Starting a tool also removes every finished measurement
    pub clear_completed_on_start: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            style: MeasureStyle::default(),
            titles: PopupTitles::default(),
            circle_sides: CIRCLE_SIDES,
            approximate_circles: false,
            live_labels: true,
            hover_marker: true,
            clear_completed_on_start: false,
        }
    }
}

impl MeasureConfig {
    /// Directory name under the user config dir
    pub const ID: &'static str = "mapmeasure";

    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            log::warn!("No config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:#}", err);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) {
        match Self::path() {
            Some(path) => {
                if let Err(err) = self.save_to(&path) {
                    log::error!("Failed to save config: {:#}", err);
                }
            }
            None => log::error!("No config directory to save into"),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// A polygon circle needs at least a triangle
    fn sanitized(mut self) -> Self {
        if self.circle_sides < 3 {
            log::warn!(
                "circle_sides {} too small, using {}",
                self.circle_sides,
                CIRCLE_SIDES
            );
            self.circle_sides = CIRCLE_SIDES;
        }
        self
    }
}
