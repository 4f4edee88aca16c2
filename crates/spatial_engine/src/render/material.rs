//! Material system for rendering

/// Default ambient reflectance
pub const DEFAULT_AMBIENT: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
/// Default diffuse reflectance
pub const DEFAULT_DIFFUSE: [f32; 4] = [0.8, 0.8, 0.8, 1.0];
/// Default specular reflectance
pub const DEFAULT_SPECULAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// Default emitted color
pub const DEFAULT_EMISSION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Maximum specular exponent
pub const MAX_SHININESS: f32 = 128.0;

/// Fixed-function surface properties handed to the draw backend with a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Ambient reflectance (RGBA)
    pub ambient: [f32; 4],

    /// Diffuse reflectance (RGBA)
    pub diffuse: [f32; 4],

    /// Specular reflectance (RGBA)
    pub specular: [f32; 4],

    /// Emitted color (RGBA)
    pub emission: [f32; 4],

    /// Specular exponent in `0..=128`
    pub shininess: f32,

    /// Let per-vertex colors drive ambient and diffuse reflectance
    pub use_color_material: bool,
}

impl Material {
    /// Create a new material with default properties
    pub fn new() -> Self {
        Self {
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
            specular: DEFAULT_SPECULAR,
            emission: DEFAULT_EMISSION,
            shininess: 0.0,
            use_color_material: false,
        }
    }

    /// Set the ambient reflectance
    pub fn with_ambient(mut self, rgba: [f32; 4]) -> Self {
        self.ambient = rgba;
        self
    }

    /// Set the diffuse reflectance
    pub fn with_diffuse(mut self, rgba: [f32; 4]) -> Self {
        self.diffuse = rgba;
        self
    }

    /// Set the specular reflectance
    pub fn with_specular(mut self, rgba: [f32; 4]) -> Self {
        self.specular = rgba;
        self
    }

    /// Set the emitted color
    pub fn with_emission(mut self, rgba: [f32; 4]) -> Self {
        self.emission = rgba;
        self
    }

    /// Set the specular exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess.clamp(0.0, MAX_SHININESS);
        self
    }

    /// Enable or disable color tracking from vertex colors
    pub fn with_color_material(mut self, enabled: bool) -> Self {
        self.use_color_material = enabled;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}
