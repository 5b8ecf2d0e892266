//! Scripted replay of map input
//!
//! A script is a JSON array of steps such as `{"start":"distance"}`,
//! `{"click":[x,y]}`, `{"move":[x,y]}`, `"cancel"`, `"select_area"` or
//! `{"key":"Escape"}`.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::{Coord, MeasureKind};
use crate::measure::handlers::MeasureController;
use crate::measure::registry::MeasurementId;
use crate::session::messages::MeasureMsg;
use crate::session::shortcuts::{self, Key, Modifiers};
use crate::surface::{DrawingSurface, MapSurface};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    Start(MeasureKind),
    Click([f64; 2]),
    Move([f64; 2]),
    Cancel,
    DrawEnd,
    Clear,
    Close(u64),
    Delete(u64),
    SelectArea,
    ClearSelection,
    /// Key name as understood by the shortcut table
    Key(String),
}

impl ScriptStep {
    /// Message for this step; key presses depend on whether a sketch is running
    pub fn to_msg(&self, drawing: bool) -> Option<MeasureMsg> {
        match self {
            ScriptStep::Start(kind) => Some(MeasureMsg::start(*kind)),
            ScriptStep::Click([x, y]) => Some(MeasureMsg::click(*x, *y)),
            ScriptStep::Move([x, y]) => Some(MeasureMsg::pointer_move(*x, *y)),
            ScriptStep::Cancel => Some(MeasureMsg::cancel()),
            ScriptStep::DrawEnd => Some(MeasureMsg::draw_end()),
            ScriptStep::Clear => Some(MeasureMsg::clear()),
            ScriptStep::Close(id) => Some(MeasureMsg::close_popup(MeasurementId(*id))),
            ScriptStep::Delete(id) => Some(MeasureMsg::delete(MeasurementId(*id))),
            ScriptStep::SelectArea => Some(MeasureMsg::select_area()),
            ScriptStep::ClearSelection => Some(MeasureMsg::clear_selection()),
            ScriptStep::Key(name) => {
                shortcuts::handle_key_event(drawing, Key::from(name.as_str()), Modifiers::NONE)
            }
        }
    }
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(text).context("Invalid replay script")
}

/// Feed every step to the controller in order
pub fn run_script<M: MapSurface, D: DrawingSurface>(
    ctrl: &mut MeasureController<M, D>,
    steps: &[ScriptStep],
) {
    for (index, step) in steps.iter().enumerate() {
        match step.to_msg(ctrl.is_drawing()) {
            Some(msg) => ctrl.handle_msg(msg),
            None => log::warn!("Step {}: {:?} does nothing", index, step),
        }
    }
}

/// Parse `minx,miny,maxx,maxy`
pub fn parse_extent(text: &str) -> Result<crate::domain::Extent> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid extent '{}'", text))?;
    match values.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok(crate::domain::Extent::from_corners(
            Coord::new(*min_x, *min_y),
            Coord::new(*max_x, *max_y),
        )),
        _ => anyhow::bail!("Extent needs four numbers, got '{}'", text),
    }
}
