//! Canvas, page chrome, dialog and fragment configuration

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Failure behaviour shared by every canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Keep rendering when a fatal component error reaches the canvas
    #[serde(default)]
    pub failsafe: bool,

    /// Require interactive components to carry a state key
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            failsafe: false,
            strict: true,
        }
    }
}

/// Page width mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    /// Narrow centred column
    #[default]
    Centered,
    /// Full width
    Wide,
}

/// Initial sidebar state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarState {
    /// Let the host decide
    #[default]
    Auto,
    /// Start open
    Expanded,
    /// Start closed
    Collapsed,
}

fn default_title() -> String {
    "Tessera App".to_string()
}

/// Page chrome, handed to the host as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Browser title
    #[serde(default = "default_title")]
    pub title: String,

    /// Width mode
    #[serde(default)]
    pub layout: PageLayout,

    /// Sidebar state on first load
    #[serde(default)]
    pub initial_sidebar_state: SidebarState,

    /// Optional icon (emoji or URL)
    #[serde(default)]
    pub page_icon: Option<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            layout: PageLayout::default(),
            initial_sidebar_state: SidebarState::default(),
            page_icon: None,
        }
    }
}

/// Dialog width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogWidth {
    /// Compact dialog
    #[default]
    Small,
    /// Wide dialog
    Large,
}

impl DialogWidth {
    /// Name passed to the host primitive
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
        }
    }
}

/// Modal dialog canvas settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Dialog heading
    pub title: String,

    /// Dialog width
    #[serde(default)]
    pub width: DialogWidth,
}

impl DialogConfig {
    /// Small dialog with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: DialogWidth::default(),
        }
    }
}

/// Fragment canvas settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentConfig {
    /// Re-run the fragment on this interval, if set
    #[serde(default)]
    pub run_every_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_config_default() {
        let config = CanvasConfig::default();
        assert!(!config.failsafe);
        assert!(config.strict);
    }

    #[test]
    fn test_page_config_parse_partial() {
        let config: PageConfig = toml::from_str(r#"layout = "wide""#).unwrap();
        assert_eq!(config.layout, PageLayout::Wide);
        assert_eq!(config.title, "Tessera App");
        assert_eq!(config.initial_sidebar_state, SidebarState::Auto);
        assert!(config.page_icon.is_none());
    }

    #[test]
    fn test_dialog_config() {
        let config: DialogConfig = toml::from_str(
            r#"
title = "Confirm"
width = "large"
"#,
        )
        .unwrap();
        assert_eq!(config.title, "Confirm");
        assert_eq!(config.width.as_str(), "large");
        assert_eq!(DialogConfig::new("x").width, DialogWidth::Small);
    }
}
