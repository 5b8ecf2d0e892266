//! Keyboard and pointer shortcuts for the measurement tools

use crate::domain::{Coord, MeasureKind};
use crate::session::messages::{MeasureEvent, MeasureMsg};

/// Named keys the tools react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Named {
    Escape,
    Enter,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(String),
    Named(Named),
    Unidentified,
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Named(Named::Escape),
            "Enter" | "Return" => Key::Named(Named::Enter),
            "Delete" => Key::Named(Named::Delete),
            "Backspace" => Key::Named(Named::Backspace),
            c if c.chars().count() == 1 => Key::Character(c.to_string()),
            _ => Key::Unidentified,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
    };

    pub fn shift(&self) -> bool {
        self.shift
    }

    pub fn control(&self) -> bool {
        self.control
    }

    pub fn alt(&self) -> bool {
        self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Map a key press to a message
///
/// `drawing` is whether a session or selection is collecting points; tool
/// hotkeys are disabled then so typing never switches tools mid-sketch.
pub fn handle_key_event(drawing: bool, key: Key, modifiers: Modifiers) -> Option<MeasureMsg> {
    match key {
        // Escape cancels a sketch, or reopens the last popup after completion
        Key::Named(Named::Escape) => Some(MeasureMsg::cancel()),
        // Enter finishes a distance or area sketch
        Key::Named(Named::Enter) if drawing => Some(MeasureMsg::draw_end()),
        // Ctrl+Delete: remove every measurement
        Key::Named(Named::Delete | Named::Backspace) if modifiers.control() => {
            Some(MeasureMsg::clear())
        }
        Key::Character(c) if !drawing && !modifiers.control() && !modifiers.alt() => {
            match c.to_ascii_lowercase().as_str() {
                "d" => Some(MeasureMsg::start(MeasureKind::Distance)),
                "a" => Some(MeasureMsg::start(MeasureKind::Area)),
                "r" => Some(MeasureMsg::start(MeasureKind::Radius)),
                "g" => Some(MeasureMsg::start(MeasureKind::Angle)),
                "s" => Some(MeasureMsg::select_area()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Map a pointer press on the map to a message
///
/// A double click only finishes the sketch. The front end delivers its first
/// press as a plain click, which is what commits the last vertex.
pub fn handle_pointer_event(button: PointerButton, at: Coord, double_click: bool) -> MeasureMsg {
    match button {
        PointerButton::Primary if double_click => MeasureMsg::draw_end(),
        PointerButton::Primary => MeasureMsg::Event(MeasureEvent::Click(at)),
        PointerButton::Secondary => MeasureMsg::cancel(),
    }
}
