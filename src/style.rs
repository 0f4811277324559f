//! Style tags resolved to document style records, one record per tag

use indexmap::IndexMap;

use crate::document::{Document, StyleDef, StyleId};
use crate::error::Result;
use crate::types::StyleTag;

impl StyleTag {
    /// Style record definition for the tag
    pub fn style_def(&self) -> StyleDef {
        match self {
            StyleTag::Default => StyleDef::default(),
            StyleTag::Highlighted => StyleDef::red_font(),
            StyleTag::Centered => StyleDef::centered(),
        }
    }
}

/// Lazily created style records of one document, keyed by tag
///
/// The first request for a tag creates the record; later requests return the
/// same [`StyleId`]. A cache belongs to exactly one document.
#[derive(Debug, Default)]
pub struct StyleCache {
    ids: IndexMap<StyleTag, StyleId>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style id for `tag`, creating the record in `doc` on first use
    pub fn resolve<D: Document>(&mut self, doc: &mut D, tag: StyleTag) -> Result<StyleId> {
        if let Some(id) = self.ids.get(&tag) {
            return Ok(*id);
        }
        let id = doc.create_style(tag.style_def())?;
        log::trace!("style {:?} -> record #{}", tag, id.index());
        self.ids.insert(tag, id);
        Ok(id)
    }

    /// Cached id, without creating anything
    pub fn get(&self, tag: StyleTag) -> Option<StyleId> {
        self.ids.get(&tag).copied()
    }

    /// Number of records created through this cache
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tags in the order they were first resolved
    pub fn tags(&self) -> impl Iterator<Item = StyleTag> + '_ {
        self.ids.keys().copied()
    }
}
