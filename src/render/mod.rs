mod post;
mod renderer;
mod shader;

pub use renderer::{Renderer, MAX_LIGHTS};

/// Toggles for the optional shading and post-processing features.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    pub texturing: bool,
    pub specular_highlights: bool,
    pub box_blur: bool,
    pub gaussian_blur: bool,
    pub sharpen: bool,
    pub invert_colors: bool,
    /// Normalized blur strength in `[0, 1)`, mapped to an odd kernel size.
    pub blur_size: f32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            texturing: true,
            specular_highlights: true,
            box_blur: false,
            gaussian_blur: false,
            sharpen: false,
            invert_colors: false,
            blur_size: 0.5,
        }
    }
}
