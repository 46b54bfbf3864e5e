use serde::{Deserialize, Serialize};

/// Character style. Unset fields inherit nothing; two runs merge only when
/// their styles are equal field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        *self == TextStyle::default()
    }

    /// Returns `self` with every field set in `overlay` replaced.
    pub fn merged(&self, overlay: &TextStyle) -> TextStyle {
        TextStyle {
            font: overlay.font.clone().or_else(|| self.font.clone()),
            size: overlay.size.or(self.size),
            color: overlay.color.clone().or_else(|| self.color.clone()),
            bold: overlay.bold.or(self.bold),
            italic: overlay.italic.or(self.italic),
        }
    }

    pub fn bold() -> Self {
        TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        }
    }

    pub fn with_color(color: impl Into<String>) -> Self {
        TextStyle {
            color: Some(color.into()),
            ..TextStyle::default()
        }
    }
}

/// Maps an all-default style to `None` so equal-looking runs compare equal.
pub fn normalize_style(style: Option<TextStyle>) -> Option<TextStyle> {
    style.filter(|style| !style.is_plain())
}
