//! Default presentation settings derived from a publication's metadata.
//!
//! A reflowable publication is rendered with a preset that depends on its
//! reading progression and on whether its single language is Chinese,
//! Japanese or Korean. Vertical CJK text, for instance, is scrolled and
//! never hyphenated.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::{Metadata, ReadingProgression};

/// The four content layouts a preset is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentLayout {
    Ltr,
    Rtl,
    CjkHorizontal,
    CjkVertical,
}

impl ContentLayout {
    /// Layout for `metadata`, from its effective reading progression and
    /// languages.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let cjk = is_cjk(&metadata.languages);
        match (metadata.effective_reading_progression(), cjk) {
            (ReadingProgression::Rtl | ReadingProgression::Btt, true) => ContentLayout::CjkVertical,
            (ReadingProgression::Rtl | ReadingProgression::Btt, false) => ContentLayout::Rtl,
            (_, true) => ContentLayout::CjkHorizontal,
            (_, false) => ContentLayout::Ltr,
        }
    }
}

impl fmt::Display for ContentLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentLayout::Ltr => "ltr",
            ContentLayout::Rtl => "rtl",
            ContentLayout::CjkHorizontal => "cjk-horizontal",
            ContentLayout::CjkVertical => "cjk-vertical",
        };
        f.write_str(name)
    }
}

/// Exactly one language, with primary subtag `zh`, `ja` or `ko`.
fn is_cjk(languages: &[String]) -> bool {
    let [language] = languages else {
        return false;
    };
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    ["zh", "ja", "ko"]
        .iter()
        .any(|cjk| primary.eq_ignore_ascii_case(cjk))
}

/// A user setting a preset can force on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentationSetting {
    Scroll,
    ColumnCount,
    TextAlignment,
    Hyphens,
    #[serde(rename = "paraIndent")]
    ParagraphIndent,
    WordSpacing,
    LetterSpacing,
    Ligatures,
}

impl PresentationSetting {
    /// ReadiumCSS user variable controlled by this setting.
    pub fn css_variable(self) -> &'static str {
        match self {
            PresentationSetting::Scroll => "--USER__scroll",
            PresentationSetting::ColumnCount => "--USER__colCount",
            PresentationSetting::TextAlignment => "--USER__textAlign",
            PresentationSetting::Hyphens => "--USER__bodyHyphens",
            PresentationSetting::ParagraphIndent => "--USER__paraIndent",
            PresentationSetting::WordSpacing => "--USER__wordSpacing",
            PresentationSetting::LetterSpacing => "--USER__letterSpacing",
            PresentationSetting::Ligatures => "--USER__ligatures",
        }
    }
}

/// Settings forced for a publication, keyed by setting.
///
/// Settings absent from the preset are left to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationPreset {
    layout: ContentLayout,
    settings: BTreeMap<PresentationSetting, bool>,
}

impl PresentationPreset {
    pub fn for_layout(layout: ContentLayout) -> Self {
        use PresentationSetting::*;

        let settings: &[(PresentationSetting, bool)] = match layout {
            ContentLayout::CjkVertical => &[
                (Scroll, true),
                (ColumnCount, false),
                (TextAlignment, false),
                (Hyphens, false),
                (ParagraphIndent, false),
                (WordSpacing, false),
                (LetterSpacing, false),
            ],
            ContentLayout::Rtl => &[
                (Hyphens, false),
                (WordSpacing, false),
                (LetterSpacing, false),
                (Ligatures, true),
            ],
            ContentLayout::CjkHorizontal => &[
                (TextAlignment, false),
                (Hyphens, false),
                (ParagraphIndent, false),
                (WordSpacing, false),
                (LetterSpacing, false),
            ],
            ContentLayout::Ltr => &[(Hyphens, false), (Ligatures, false)],
        };

        Self {
            layout,
            settings: settings.iter().copied().collect(),
        }
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self::for_layout(ContentLayout::from_metadata(metadata))
    }

    pub fn layout(&self) -> ContentLayout {
        self.layout
    }

    /// Forced value of `setting`, or `None` if the reader decides.
    pub fn get(&self, setting: PresentationSetting) -> Option<bool> {
        self.settings.get(&setting).copied()
    }

    pub fn settings(&self) -> impl Iterator<Item = (PresentationSetting, bool)> + '_ {
        self.settings.iter().map(|(setting, value)| (*setting, *value))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl Default for PresentationPreset {
    fn default() -> Self {
        Self::for_layout(ContentLayout::Ltr)
    }
}
