#![forbid(unsafe_code)]

use crate::{ContractViolation, SchemaVersion, Validate};

pub const LAYOUT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_BLOCKS: usize = 4096;
const MAX_LABEL_LEN: usize = 128;

/// One atomic content unit (paragraph, table row, list entry) with its
/// measured position. Atomic means it must never be split across a page
/// boundary; nested sub-notes inside a split-prone parent are measured as
/// their own blocks so only the oversized part has to move.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub top: f64,
    pub height: f64,
    pub label: String,
}

impl ContentBlock {
    pub fn v1(top: f64, height: f64, label: String) -> Result<Self, ContractViolation> {
        let block = Self { top, height, label };
        block.validate()?;
        Ok(block)
    }
}

impl Validate for ContentBlock {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.top.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "content_block.top",
            });
        }
        if !self.height.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "content_block.height",
            });
        }
        if self.top < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "content_block.top",
                reason: "must be >= 0",
            });
        }
        if self.height < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "content_block.height",
                reason: "must be >= 0",
            });
        }
        if self.label.len() > MAX_LABEL_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "content_block.label",
                reason: "exceeds max length",
            });
        }
        Ok(())
    }
}

/// A measurement pass over the continuously flowing render tree: blocks in
/// document order, positions in render pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredLayout {
    pub schema_version: SchemaVersion,
    pub blocks: Vec<ContentBlock>,
}

impl MeasuredLayout {
    pub fn v1(blocks: Vec<ContentBlock>) -> Result<Self, ContractViolation> {
        let layout = Self {
            schema_version: LAYOUT_CONTRACT_VERSION,
            blocks,
        };
        layout.validate()?;
        Ok(layout)
    }
}

impl Validate for MeasuredLayout {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != LAYOUT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "measured_layout.schema_version",
                reason: "must match LAYOUT_CONTRACT_VERSION",
            });
        }
        if self.blocks.len() > MAX_BLOCKS {
            return Err(ContractViolation::InvalidValue {
                field: "measured_layout.blocks",
                reason: "exceeds max block count",
            });
        }
        let mut previous_top = 0.0_f64;
        for block in &self.blocks {
            block.validate()?;
            if block.top < previous_top {
                return Err(ContractViolation::InvalidValue {
                    field: "measured_layout.blocks",
                    reason: "must be in document order",
                });
            }
            previous_top = block.top;
        }
        Ok(())
    }
}

/// Extra top margin for one block. Earlier blocks are never moved by a later
/// block's adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAdjustment {
    pub index: usize,
    pub added_margin_top: f64,
}

impl BlockAdjustment {
    pub fn v1(index: usize, added_margin_top: f64) -> Result<Self, ContractViolation> {
        let adjustment = Self {
            index,
            added_margin_top,
        };
        adjustment.validate()?;
        Ok(adjustment)
    }
}

impl Validate for BlockAdjustment {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.added_margin_top.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "block_adjustment.added_margin_top",
            });
        }
        if self.added_margin_top <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "block_adjustment.added_margin_top",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Planner output against one fresh measurement pass. Valid only for the
/// measurement it was computed from; re-measure before planning again.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBreakPlan {
    pub schema_version: SchemaVersion,
    pub page_height: f64,
    pub adjustments: Vec<BlockAdjustment>,
}

impl PageBreakPlan {
    pub fn v1(page_height: f64, adjustments: Vec<BlockAdjustment>) -> Result<Self, ContractViolation> {
        let plan = Self {
            schema_version: LAYOUT_CONTRACT_VERSION,
            page_height,
            adjustments,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn margin_for(&self, index: usize) -> f64 {
        self.adjustments
            .iter()
            .find(|a| a.index == index)
            .map(|a| a.added_margin_top)
            .unwrap_or(0.0)
    }
}

impl Validate for PageBreakPlan {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != LAYOUT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "page_break_plan.schema_version",
                reason: "must match LAYOUT_CONTRACT_VERSION",
            });
        }
        validate_page_height("page_break_plan.page_height", self.page_height)?;
        let mut previous_index: Option<usize> = None;
        for adjustment in &self.adjustments {
            adjustment.validate()?;
            if let Some(previous) = previous_index {
                if adjustment.index <= previous {
                    return Err(ContractViolation::InvalidValue {
                        field: "page_break_plan.adjustments",
                        reason: "indices must be strictly increasing",
                    });
                }
            }
            previous_index = Some(adjustment.index);
        }
        Ok(())
    }
}

/// A layout where every atomic block lies entirely within one page. This is
/// the only shape the export collaborator accepts; validation is the
/// enforcement point for the no-split guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSafeLayout {
    pub schema_version: SchemaVersion,
    pub page_height: f64,
    pub blocks: Vec<ContentBlock>,
    pub content_height: f64,
}

impl PageSafeLayout {
    pub fn v1(
        page_height: f64,
        blocks: Vec<ContentBlock>,
        content_height: f64,
    ) -> Result<Self, ContractViolation> {
        let layout = Self {
            schema_version: LAYOUT_CONTRACT_VERSION,
            page_height,
            blocks,
            content_height,
        };
        layout.validate()?;
        Ok(layout)
    }
}

impl Validate for PageSafeLayout {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != LAYOUT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "page_safe_layout.schema_version",
                reason: "must match LAYOUT_CONTRACT_VERSION",
            });
        }
        validate_page_height("page_safe_layout.page_height", self.page_height)?;
        if !self.content_height.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "page_safe_layout.content_height",
            });
        }
        if self.blocks.len() > MAX_BLOCKS {
            return Err(ContractViolation::InvalidValue {
                field: "page_safe_layout.blocks",
                reason: "exceeds max block count",
            });
        }
        for block in &self.blocks {
            block.validate()?;
            let end = block.top + block.height;
            if end > self.content_height {
                return Err(ContractViolation::InvalidValue {
                    field: "page_safe_layout.content_height",
                    reason: "must cover every block",
                });
            }
            // Blocks taller than a page cannot fit on any page; they are the
            // caller's granularity problem, not a straddle violation.
            if block.height >= self.page_height {
                continue;
            }
            let start_page = (block.top / self.page_height).floor();
            let end_page = (end / self.page_height).floor();
            let flush_end = end == end_page * self.page_height;
            if start_page != end_page && !flush_end {
                return Err(ContractViolation::InvalidValue {
                    field: "page_safe_layout.blocks",
                    reason: "block straddles a page boundary",
                });
            }
        }
        Ok(())
    }
}

/// Per-page draw offsets for slicing the continuous content image into
/// fixed-height pages. Offset k is the vertical translation of the full
/// image when drawing page k.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlicePlan {
    pub schema_version: SchemaVersion,
    pub page_height: f64,
    pub content_height: f64,
    pub draw_offsets: Vec<f64>,
}

impl PageSlicePlan {
    pub fn v1(
        page_height: f64,
        content_height: f64,
        draw_offsets: Vec<f64>,
    ) -> Result<Self, ContractViolation> {
        let plan = Self {
            schema_version: LAYOUT_CONTRACT_VERSION,
            page_height,
            content_height,
            draw_offsets,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn page_count(&self) -> usize {
        self.draw_offsets.len()
    }
}

impl Validate for PageSlicePlan {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != LAYOUT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "page_slice_plan.schema_version",
                reason: "must match LAYOUT_CONTRACT_VERSION",
            });
        }
        validate_page_height("page_slice_plan.page_height", self.page_height)?;
        if !self.content_height.is_finite() || self.content_height < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "page_slice_plan.content_height",
                reason: "must be finite and >= 0",
            });
        }
        match self.draw_offsets.first() {
            Some(first) if *first == 0.0 => {}
            _ => {
                return Err(ContractViolation::InvalidValue {
                    field: "page_slice_plan.draw_offsets",
                    reason: "must start with a zero-offset first page",
                });
            }
        }
        for offset in &self.draw_offsets {
            if !offset.is_finite() {
                return Err(ContractViolation::NotFinite {
                    field: "page_slice_plan.draw_offsets",
                });
            }
            if *offset > 0.0 {
                return Err(ContractViolation::InvalidValue {
                    field: "page_slice_plan.draw_offsets",
                    reason: "offsets translate upward and must be <= 0",
                });
            }
        }
        Ok(())
    }
}

fn validate_page_height(field: &'static str, value: f64) -> Result<(), ContractViolation> {
    if !value.is_finite() {
        return Err(ContractViolation::NotFinite { field });
    }
    if value <= 0.0 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be > 0",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(top: f64, height: f64) -> ContentBlock {
        ContentBlock::v1(top, height, "para".to_string()).unwrap()
    }

    #[test]
    fn at_layout_01_measured_layout_requires_document_order() {
        let layout = MeasuredLayout::v1(vec![block(0.0, 100.0), block(120.0, 40.0)]);
        assert!(layout.is_ok());

        let out_of_order = MeasuredLayout::v1(vec![block(120.0, 40.0), block(0.0, 100.0)]);
        assert!(out_of_order.is_err());
    }

    #[test]
    fn at_layout_02_page_safe_layout_rejects_straddling_block() {
        let err = PageSafeLayout::v1(1000.0, vec![block(950.0, 100.0)], 1050.0).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::InvalidValue {
                field: "page_safe_layout.blocks",
                reason: "block straddles a page boundary",
            }
        );
    }

    #[test]
    fn at_layout_03_page_safe_layout_allows_flush_fit_and_oversized_blocks() {
        // Ends exactly on the boundary: the half-open interval stays on page 0.
        assert!(PageSafeLayout::v1(1000.0, vec![block(900.0, 100.0)], 1000.0).is_ok());
        // Taller than a page: exempt from the straddle check.
        assert!(PageSafeLayout::v1(1000.0, vec![block(0.0, 2400.0)], 2400.0).is_ok());
    }

    #[test]
    fn at_layout_04_non_finite_geometry_is_rejected() {
        let nan_block = ContentBlock {
            top: f64::NAN,
            height: 10.0,
            label: String::new(),
        };
        assert_eq!(
            nan_block.validate().unwrap_err(),
            ContractViolation::NotFinite {
                field: "content_block.top",
            }
        );
    }

    #[test]
    fn at_layout_05_slice_plan_requires_zero_first_offset() {
        assert!(PageSlicePlan::v1(1000.0, 1500.0, vec![0.0, -500.0]).is_ok());
        assert!(PageSlicePlan::v1(1000.0, 1500.0, vec![-500.0]).is_err());
        assert!(PageSlicePlan::v1(1000.0, 1500.0, vec![]).is_err());
    }
}
