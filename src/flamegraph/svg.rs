//! SVG rendering of folded stacks using inferno.

use super::fold::Flamegraph;
use crate::utils::error::FlamegraphError;
use log::info;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
    pub count_name: String,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Aggregated Flamegraph".to_string(),
            width: 1200,
            count_name: "samples".to_string(),
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Render a flamegraph to an SVG document
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - nothing survived folding
/// * `FlamegraphError::Render` - inferno failed to render
pub fn render_svg(
    flamegraph: &Flamegraph,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if flamegraph.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }
    let config = config.cloned().unwrap_or_default();
    let lines = flamegraph.collapsed_lines();
    info!("Rendering flamegraph with {} stacks", lines.len());

    let mut options = inferno::flamegraph::Options::default();
    options.title = config.title;
    options.count_name = config.count_name;
    options.image_width = Some(config.width);

    let mut svg = Vec::new();
    inferno::flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::Render(e.to_string()))?;

    let svg = String::from_utf8(svg)?;
    info!("Flamegraph rendered ({} bytes)", svg.len());
    Ok(svg)
}
