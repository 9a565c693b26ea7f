#![forbid(unsafe_code)]

use snapsign_kernel_contracts::layout::{
    BlockAdjustment, ContentBlock, MeasuredLayout, PageBreakPlan, PageSafeLayout, PageSlicePlan,
};
use snapsign_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBreakConfig {
    /// Page height in render pixels.
    pub page_height: f64,
    /// Extra clearance past the boundary when a block is pushed.
    pub break_buffer: f64,
    /// Remaining-height threshold below which no further page is sliced;
    /// swallows sub-pixel rounding that would add an empty trailing page.
    pub slice_tolerance: f64,
}

impl PageBreakConfig {
    /// A4 portrait at 96 dpi.
    pub fn a4_96dpi_v1() -> Self {
        Self {
            page_height: 1122.5,
            break_buffer: 20.0,
            slice_tolerance: 1.0,
        }
    }
}

/// Plans per-block top-margin adjustments so no atomic block straddles a
/// page boundary. Pure over one fresh measurement pass: planning the same
/// measurement twice yields the same plan. Never re-plan an already adjusted
/// layout without re-measuring; applied margins change every later offset.
#[derive(Debug, Clone)]
pub struct PageBreakPlanner {
    config: PageBreakConfig,
}

impl PageBreakPlanner {
    pub fn new(config: PageBreakConfig) -> Result<Self, ContractViolation> {
        if !config.page_height.is_finite() || config.page_height <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "page_break_config.page_height",
                reason: "must be finite and > 0",
            });
        }
        if !config.break_buffer.is_finite() || config.break_buffer < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "page_break_config.break_buffer",
                reason: "must be finite and >= 0",
            });
        }
        if !config.slice_tolerance.is_finite() || config.slice_tolerance <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "page_break_config.slice_tolerance",
                reason: "must be finite and > 0",
            });
        }
        Ok(Self { config })
    }

    pub fn plan(&self, layout: &MeasuredLayout) -> Result<PageBreakPlan, ContractViolation> {
        layout.validate()?;

        let page_height = self.config.page_height;
        let mut cumulative = 0.0_f64;
        let mut adjustments: Vec<BlockAdjustment> = Vec::new();

        for (index, block) in layout.blocks.iter().enumerate() {
            // A block at least one page tall cannot fit on any page; pushing
            // it would only cascade every later block for nothing.
            if block.height >= page_height {
                continue;
            }
            let effective_top = block.top + cumulative;
            let start_page = (effective_top / page_height).floor();
            let end_page = ((effective_top + block.height) / page_height).floor();
            if start_page != end_page {
                let to_next_boundary = (start_page + 1.0) * page_height - effective_top;
                let margin = to_next_boundary + self.config.break_buffer;
                adjustments.push(BlockAdjustment {
                    index,
                    added_margin_top: margin,
                });
                cumulative += margin;
            }
        }

        PageBreakPlan::v1(page_height, adjustments)
    }

    /// Applies a plan back onto the measurement it was computed from,
    /// yielding the page-safe layout the export collaborator consumes.
    pub fn apply(
        &self,
        layout: &MeasuredLayout,
        plan: &PageBreakPlan,
    ) -> Result<PageSafeLayout, ContractViolation> {
        layout.validate()?;
        plan.validate()?;

        let mut cumulative = 0.0_f64;
        let mut placed: Vec<ContentBlock> = Vec::with_capacity(layout.blocks.len());
        for (index, block) in layout.blocks.iter().enumerate() {
            cumulative += plan.margin_for(index);
            placed.push(ContentBlock {
                top: block.top + cumulative,
                height: block.height,
                label: block.label.clone(),
            });
        }
        let content_height = placed
            .iter()
            .map(|block| block.top + block.height)
            .fold(0.0_f64, f64::max);

        PageSafeLayout::v1(self.config.page_height, placed, content_height)
    }

    /// Slicing schedule for the exporter: page 0 draws at offset zero, each
    /// further page translates the full content image up by one page height,
    /// until less than the tolerance remains.
    pub fn slice(&self, content_height: f64) -> Result<PageSlicePlan, ContractViolation> {
        if !content_height.is_finite() || content_height < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "page_slice_plan.content_height",
                reason: "must be finite and >= 0",
            });
        }

        let mut draw_offsets = vec![0.0_f64];
        let mut height_left = content_height - self.config.page_height;
        while height_left >= self.config.slice_tolerance {
            draw_offsets.push(height_left - content_height);
            height_left -= self.config.page_height;
        }

        PageSlicePlan::v1(self.config.page_height, content_height, draw_offsets)
    }
}
