//! Stacking configuration types

use crate::focus_stack::fusion::FusionConfig;
use crate::focus_stack::io::OutputConfig;
use crate::focus_stack::raster::BitDepth;
use crate::focus_stack::registration::RegistrationConfig;

/// Configuration for a stacking run
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    /// Rough and fine ECC passes and the warp filter
    pub registration: RegistrationConfig,
    /// Fusion rule tuning
    pub fusion: FusionConfig,
    /// Register frames; when false every frame is treated as pre-aligned
    pub align: bool,
    /// Bit depth of the stacked image and of previews
    pub output_depth: BitDepth,
    /// Cut the result down to the area every warped frame covers
    pub crop: bool,
    /// Attach previews to progress snapshots
    pub previews: bool,
    /// Encoding options used by `stack_to_file`
    pub output: OutputConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            registration: RegistrationConfig::default(),
            fusion: FusionConfig::default(),
            align: true,
            output_depth: BitDepth::Eight,
            crop: true,
            previews: true,
            output: OutputConfig::default(),
        }
    }
}

impl StackConfig {
    pub fn builder() -> StackConfigBuilder {
        StackConfigBuilder::default()
    }
}

/// Builder for StackConfig
#[derive(Default)]
pub struct StackConfigBuilder {
    registration: Option<RegistrationConfig>,
    fusion: Option<FusionConfig>,
    align: Option<bool>,
    output_depth: Option<BitDepth>,
    crop: Option<bool>,
    previews: Option<bool>,
    output: Option<OutputConfig>,
}

impl StackConfigBuilder {
    pub fn registration(mut self, registration: RegistrationConfig) -> Self {
        self.registration = Some(registration);
        self
    }

    pub fn fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = Some(fusion);
        self
    }

    pub fn align(mut self, enable: bool) -> Self {
        self.align = Some(enable);
        self
    }

    pub fn output_depth(mut self, depth: BitDepth) -> Self {
        self.output_depth = Some(depth);
        self
    }

    pub fn crop(mut self, enable: bool) -> Self {
        self.crop = Some(enable);
        self
    }

    pub fn previews(mut self, enable: bool) -> Self {
        self.previews = Some(enable);
        self
    }

    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    pub fn build(self) -> StackConfig {
        let default = StackConfig::default();
        StackConfig {
            registration: self.registration.unwrap_or(default.registration),
            fusion: self.fusion.unwrap_or(default.fusion),
            align: self.align.unwrap_or(default.align),
            output_depth: self.output_depth.unwrap_or(default.output_depth),
            crop: self.crop.unwrap_or(default.crop),
            previews: self.previews.unwrap_or(default.previews),
            output: self.output.unwrap_or(default.output),
        }
    }
}
