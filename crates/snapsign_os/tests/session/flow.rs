use snapsign_kernel_contracts::catalog::PricingCatalog;
use snapsign_kernel_contracts::layout::{ContentBlock, MeasuredLayout, PageSafeLayout, PageSlicePlan};
use snapsign_kernel_contracts::state::{OptionSign, SessionMode};
use snapsign_os::export::{
    DocumentRasterizer, ExportArtifact, ExportConfig, ExportError, ExportRuntime, RasterizeFailure,
};
use snapsign_os::session::{ApplyOutcome, ContractEvent, ContractSession, ExportGate, TextField};
use snapsign_os::share_link::{ShareLinkBuilder, ShareLinkConfig};

const BASE_URL: &str = "https://snapsign.studio/contract";

struct CountingRasterizer;

impl DocumentRasterizer for CountingRasterizer {
    fn rasterize(
        &self,
        layout: &PageSafeLayout,
        slices: &PageSlicePlan,
        file_name: &str,
    ) -> Result<ExportArtifact, RasterizeFailure> {
        ExportArtifact::v1(
            file_name.to_string(),
            layout.blocks.len().max(1) * 1024,
            slices.page_count(),
        )
        .map_err(|violation| RasterizeFailure {
            message: format!("{violation:?}"),
        })
    }
}

struct BrokenRasterizer;

impl DocumentRasterizer for BrokenRasterizer {
    fn rasterize(
        &self,
        _layout: &PageSafeLayout,
        _slices: &PageSlicePlan,
        _file_name: &str,
    ) -> Result<ExportArtifact, RasterizeFailure> {
        Err(RasterizeFailure {
            message: "font resources never finished loading".to_string(),
        })
    }
}

fn author_a_contract() -> ContractSession {
    let mut session = ContractSession::new_authoring(PricingCatalog::mvp_v1()).unwrap();
    session
        .apply(ContractEvent::EditText {
            field: TextField::ContractorName,
            value: "홍길동".to_string(),
        })
        .unwrap();
    session
        .apply(ContractEvent::SelectPackage {
            key: "standard".to_string(),
        })
        .unwrap();
    session
        .apply(ContractEvent::SelectOption {
            key: "banquet".to_string(),
        })
        .unwrap();
    session
        .apply(ContractEvent::ToggleCustomOptionGate { enabled: true })
        .unwrap();
    session
        .apply(ContractEvent::AddCustomOption {
            name: "원판 촬영".to_string(),
            price: "10000".to_string(),
            sign: OptionSign::Minus,
        })
        .unwrap();
    session
        .apply(ContractEvent::ToggleDiscount {
            id: "partner".to_string(),
        })
        .unwrap();
    session
}

fn measured_contract_layout() -> MeasuredLayout {
    MeasuredLayout::v1(vec![
        ContentBlock::v1(0.0, 320.0, "header".to_string()).unwrap(),
        ContentBlock::v1(340.0, 560.0, "info_table".to_string()).unwrap(),
        ContentBlock::v1(920.0, 180.0, "article_1".to_string()).unwrap(),
        ContentBlock::v1(1100.0, 100.0, "article_2".to_string()).unwrap(),
        ContentBlock::v1(1220.0, 240.0, "article_3".to_string()).unwrap(),
        ContentBlock::v1(1480.0, 160.0, "signature_block".to_string()).unwrap(),
    ])
    .unwrap()
}

#[test]
fn authoring_edits_converge_on_the_worked_price() {
    let session = author_a_contract();
    // 220,000 + 50,000 - 10,000 - 10,000.
    assert_eq!(session.state().final_price, "250,000원");
}

#[test]
fn author_share_receive_sign_flow() {
    let builder = ShareLinkBuilder::new(ShareLinkConfig::mvp_v1());
    let mut author = author_a_contract();
    let link = author.build_share_link(&builder, BASE_URL).unwrap();

    let load = ContractSession::open_v1(PricingCatalog::mvp_v1(), &builder, &link.url).unwrap();
    assert!(load.rejected.is_none());
    let mut received = load.session;
    assert_eq!(received.mode(), SessionMode::Received);
    assert_eq!(received.state(), author.state());

    // The receiving party signs; everything else stays intact.
    received
        .apply(ContractEvent::CaptureSignature {
            payload: "data:image/png;base64,c2lnbmF0dXJl".to_string(),
        })
        .unwrap();
    assert!(received.state().signature.is_some());
    assert_eq!(received.state().final_price, "250,000원");
}

#[test]
fn export_runs_on_a_frozen_snapshot_and_failure_restores_interactivity() {
    let mut session = author_a_contract();
    let runtime = ExportRuntime::new(ExportConfig::mvp_v1(), BrokenRasterizer).unwrap();

    assert_eq!(session.begin_export(), ExportGate::Begun);
    let refused = session
        .apply(ContractEvent::SelectPackage {
            key: "film".to_string(),
        })
        .unwrap();
    assert_eq!(refused, ApplyOutcome::RefusedExportInFlight);

    let before = session.state().clone();
    let err = runtime
        .run(&measured_contract_layout(), &session.state().contractor_name)
        .unwrap_err();
    assert!(matches!(err, ExportError::Rasterize(_)));
    session.end_export(false);

    // The failed export changed nothing and the session is interactive again.
    assert_eq!(session.state(), &before);
    let applied = session
        .apply(ContractEvent::SelectPackage {
            key: "film".to_string(),
        })
        .unwrap();
    assert_eq!(applied, ApplyOutcome::Applied { repriced: true });
}

#[test]
fn successful_export_names_the_file_after_the_contractor() {
    let mut session = author_a_contract();
    let runtime = ExportRuntime::new(ExportConfig::mvp_v1(), CountingRasterizer).unwrap();

    assert_eq!(session.begin_export(), ExportGate::Begun);
    let artifact = runtime
        .run(&measured_contract_layout(), &session.state().contractor_name)
        .unwrap();
    session.end_export(true);

    assert_eq!(artifact.file_name, "contract_홍길동.pdf");
    assert_eq!(artifact.page_count, 2);
    assert!(!session.export_in_flight());
}
