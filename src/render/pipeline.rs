use crate::effects::blend::BlendOp;
use crate::effects::composite::composite_in_place;
use crate::effects::filter::{BuiltinFilter, ImageFilter};
use crate::foundation::core::Canvas;
use crate::foundation::error::{CartoError, CartoResult};
use crate::render::surface::Surface;
use crate::scene::model::{FilterSpec, StyleConfig, resolve_comp_op};

/// Style parameters with the comp-op resolved and filters built.
#[derive(Debug)]
pub struct ResolvedStyle {
    pub comp_op: Option<BlendOp>,
    pub opacity: f32,
    /// Run over the isolated buffer before it merges.
    pub image_filters: Vec<Box<dyn ImageFilter>>,
    /// Run over the main surface after the merge.
    pub direct_image_filters: Vec<Box<dyn ImageFilter>>,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            comp_op: None,
            opacity: 1.0,
            image_filters: Vec::new(),
            direct_image_filters: Vec::new(),
        }
    }
}

impl ResolvedStyle {
    pub fn from_config(cfg: &StyleConfig) -> CartoResult<Self> {
        Ok(Self {
            comp_op: resolve_comp_op(cfg.comp_op.as_deref()),
            opacity: cfg.opacity.clamp(0.0, 1.0),
            image_filters: build_filters(&cfg.image_filters)?,
            direct_image_filters: build_filters(&cfg.direct_image_filters)?,
        })
    }

    pub fn requires_isolation(&self) -> bool {
        self.comp_op.is_some() || !self.image_filters.is_empty() || self.opacity < 1.0
    }
}

fn build_filters(specs: &[FilterSpec]) -> CartoResult<Vec<Box<dyn ImageFilter>>> {
    specs
        .iter()
        .map(|s| BuiltinFilter::from_spec(s).map(|f| Box::new(f) as Box<dyn ImageFilter>))
        .collect()
}

/// Which surface symbolizer draws currently land in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    Main,
    Isolated,
}

/// Main surface plus one reusable off-screen buffer for style isolation.
#[derive(Debug)]
pub struct CompositingPipeline {
    main: Surface,
    isolated: Option<Surface>,
    state: TargetState,
    style_open: bool,
    isolated_allocations: u32,
}

impl CompositingPipeline {
    pub fn new(canvas: Canvas) -> CartoResult<Self> {
        Ok(Self {
            main: Surface::for_canvas(canvas)?,
            isolated: None,
            state: TargetState::Main,
            style_open: false,
            isolated_allocations: 0,
        })
    }

    pub fn main(&self) -> &Surface {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Surface {
        &mut self.main
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// True between `begin_style` and the matching `end_style`.
    pub fn style_open(&self) -> bool {
        self.style_open
    }

    /// Times the isolated buffer was allocated. Stays at 1 no matter how many styles isolate.
    pub fn isolated_allocations(&self) -> u32 {
        self.isolated_allocations
    }

    pub fn into_main(self) -> Surface {
        self.main
    }

    /// Surface the current style draws into.
    pub fn target_mut(&mut self) -> &mut Surface {
        match (self.state, self.isolated.as_mut()) {
            (TargetState::Isolated, Some(iso)) => iso,
            _ => &mut self.main,
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn begin_style(&mut self, style: &ResolvedStyle) -> CartoResult<()> {
        if self.style_open {
            return Err(CartoError::validation(
                "begin_style called while another style is open",
            ));
        }
        self.style_open = true;
        if !style.requires_isolation() {
            self.state = TargetState::Main;
            return Ok(());
        }

        match self.isolated.as_mut() {
            Some(iso) => iso.clear([0, 0, 0, 0]),
            None => {
                self.isolated = Some(Surface::for_canvas(self.main.canvas())?);
                self.isolated_allocations += 1;
            }
        }
        tracing::debug!(
            comp_op = ?style.comp_op,
            opacity = style.opacity,
            filters = style.image_filters.len(),
            "style isolated"
        );
        self.state = TargetState::Isolated;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn end_style(&mut self, style: &ResolvedStyle) -> CartoResult<()> {
        if !self.style_open {
            return Err(CartoError::validation("end_style called without begin_style"));
        }
        self.style_open = false;
        let result = self.merge(style);
        self.state = TargetState::Main;
        result
    }

    fn merge(&mut self, style: &ResolvedStyle) -> CartoResult<()> {
        if self.state == TargetState::Isolated
            && let Some(iso) = self.isolated.as_mut()
        {
            for filter in &style.image_filters {
                filter.apply(iso)?;
            }
            let op = style.comp_op.unwrap_or(BlendOp::SrcOver);
            composite_in_place(self.main.data_mut(), iso.data(), op, style.opacity)?;
        }
        for filter in &style.direct_image_filters {
            filter.apply(&mut self.main)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
