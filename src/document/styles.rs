//! Cell style records shared by every back-end

use crate::error::{ExcelError, Result};

/// Font color of a cell style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontColor {
    #[default]
    Automatic,
    Red,
}

/// Horizontal alignment of a cell style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlign {
    #[default]
    General,
    Center,
}

/// Definition of one cell style record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleDef {
    pub font_color: FontColor,
    pub horizontal_align: HorizontalAlign,
}

impl StyleDef {
    pub fn red_font() -> Self {
        StyleDef {
            font_color: FontColor::Red,
            ..Default::default()
        }
    }

    pub fn centered() -> Self {
        StyleDef {
            horizontal_align: HorizontalAlign::Center,
            ..Default::default()
        }
    }
}

/// Handle to a style record inside one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StyleId(pub(crate) u32);

impl StyleId {
    /// The document's built-in base format
    pub const BASE: StyleId = StyleId(0);

    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Ordered style records of a document; index 0 is the base format
#[derive(Debug, Clone)]
pub struct StyleTable {
    defs: Vec<StyleDef>,
    max_styles: usize,
}

impl StyleTable {
    pub fn new(max_styles: usize) -> Self {
        StyleTable {
            defs: vec![StyleDef::default()],
            max_styles,
        }
    }

    /// Append a record; identical definitions still get a new id
    pub fn push(&mut self, def: StyleDef) -> Result<StyleId> {
        if self.defs.len() >= self.max_styles {
            return Err(ExcelError::TooManyStyles {
                max: self.max_styles,
            });
        }
        let id = StyleId(self.defs.len() as u32);
        self.defs.push(def);
        log::trace!("created style record #{} {:?}", id.0, def);
        Ok(id)
    }

    pub fn get(&self, id: StyleId) -> Option<&StyleDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn contains(&self, id: StyleId) -> bool {
        (id.0 as usize) < self.defs.len()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDef> {
        self.defs.iter()
    }

    /// Whether any record asks for a red font
    pub fn uses_red_font(&self) -> bool {
        self.defs.iter().any(|d| d.font_color == FontColor::Red)
    }
}
