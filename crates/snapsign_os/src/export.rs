#![forbid(unsafe_code)]

use snapsign_engines::page_break::{PageBreakConfig, PageBreakPlanner};
use snapsign_kernel_contracts::layout::{MeasuredLayout, PageSafeLayout, PageSlicePlan};
use snapsign_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug)]
pub enum ExportError {
    /// The measurement pass or the page-break plan produced out-of-contract
    /// geometry; nothing was handed to the rasterizer.
    Layout(ContractViolation),
    /// The rasterizing collaborator reported a failure.
    Rasterize(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Layout(violation) => write!(f, "export layout error: {violation:?}"),
            Self::Rasterize(reason) => write!(f, "export rasterize error: {reason}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<ContractViolation> for ExportError {
    fn from(value: ContractViolation) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug)]
pub struct RasterizeFailure {
    pub message: String,
}

/// Descriptor of one finished export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub byte_len: usize,
    pub page_count: usize,
}

impl ExportArtifact {
    pub fn v1(
        file_name: String,
        byte_len: usize,
        page_count: usize,
    ) -> Result<Self, ContractViolation> {
        let artifact = Self {
            file_name,
            byte_len,
            page_count,
        };
        artifact.validate()?;
        Ok(artifact)
    }
}

impl Validate for ExportArtifact {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.file_name.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "export_artifact.file_name",
                reason: "must be non-empty",
            });
        }
        if self.byte_len == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "export_artifact.byte_len",
                reason: "must be > 0",
            });
        }
        if self.page_count == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "export_artifact.page_count",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// The external document collaborator. It receives a layout that already
/// satisfies the no-split guarantee plus the slicing schedule; it never sees
/// a straddling block.
pub trait DocumentRasterizer {
    fn rasterize(
        &self,
        layout: &PageSafeLayout,
        slices: &PageSlicePlan,
        file_name: &str,
    ) -> Result<ExportArtifact, RasterizeFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    pub page_break: PageBreakConfig,
    pub file_name_prefix: &'static str,
    /// File-name stem when the contractor name is still blank.
    pub fallback_stem: &'static str,
}

impl ExportConfig {
    pub fn mvp_v1() -> Self {
        Self {
            page_break: PageBreakConfig::a4_96dpi_v1(),
            file_name_prefix: "contract_",
            fallback_stem: "draft",
        }
    }
}

/// Drives one export pass over a point-in-time measurement of the render
/// tree. Never touches session state; the in-flight gate is the session's.
#[derive(Debug, Clone)]
pub struct ExportRuntime<R>
where
    R: DocumentRasterizer,
{
    config: ExportConfig,
    planner: PageBreakPlanner,
    rasterizer: R,
}

impl<R> ExportRuntime<R>
where
    R: DocumentRasterizer,
{
    pub fn new(config: ExportConfig, rasterizer: R) -> Result<Self, ContractViolation> {
        let planner = PageBreakPlanner::new(config.page_break)?;
        Ok(Self {
            config,
            planner,
            rasterizer,
        })
    }

    pub fn file_name(&self, contractor_name: &str) -> String {
        let stem = contractor_name.trim();
        let stem = if stem.is_empty() {
            self.config.fallback_stem
        } else {
            stem
        };
        format!("{}{}.pdf", self.config.file_name_prefix, stem)
    }

    pub fn run(
        &self,
        measured: &MeasuredLayout,
        contractor_name: &str,
    ) -> Result<ExportArtifact, ExportError> {
        let plan = self.planner.plan(measured)?;
        let page_safe = self.planner.apply(measured, &plan)?;
        let slices = self.planner.slice(page_safe.content_height)?;
        let file_name = self.file_name(contractor_name);

        let artifact = self
            .rasterizer
            .rasterize(&page_safe, &slices, &file_name)
            .map_err(|failure| ExportError::Rasterize(failure.message))?;
        artifact.validate()?;
        Ok(artifact)
    }
}
