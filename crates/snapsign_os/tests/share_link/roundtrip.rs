use snapsign_engines::codec::StateCodec;
use snapsign_kernel_contracts::catalog::PricingCatalog;
use snapsign_kernel_contracts::state::{ContractState, CustomOption, CustomOptionId, OptionSign};
use snapsign_os::share_link::{ShareLinkBuilder, ShareLinkConfig, ShareLinkError};

const BASE_URL: &str = "https://snapsign.studio/contract";

fn builder() -> ShareLinkBuilder {
    ShareLinkBuilder::new(ShareLinkConfig::mvp_v1())
}

/// A state exercising every field type: free text, enum keys, the boolean
/// gate, the nested list, the discount set, the derived price cache, and
/// the opaque signature blob.
fn every_field_state() -> ContractState {
    let mut state = ContractState::authoring_v1(&PricingCatalog::mvp_v1()).unwrap();
    state.contractor_name = "홍길동".to_string();
    state.venue = "XX호텔 YY홀".to_string();
    state.contact = "010-1234-5678".to_string();
    state.wedding_date = "2026-10-17".to_string();
    state.wedding_time = "13:30".to_string();
    state.package_config = "standard".to_string();
    state.options = "banquet".to_string();
    state.has_custom_option = true;
    state.custom_options = vec![
        CustomOption {
            id: CustomOptionId(1),
            name: "출장비".to_string(),
            price: "30000".to_string(),
            sign: OptionSign::Plus,
        },
        CustomOption {
            id: CustomOptionId(2),
            name: String::new(),
            price: "10000".to_string(),
            sign: OptionSign::Minus,
        },
    ];
    state.discount_items = vec!["partner".to_string(), "review".to_string()];
    state.final_price = "260,000원".to_string();
    state.signature = Some("data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==".to_string());
    state
}

#[test]
fn full_state_survives_the_link_round_trip() {
    let state = every_field_state();
    let build = builder().build(&state, BASE_URL).unwrap();
    let parsed = builder().parse(&build.url).unwrap();
    assert_eq!(parsed, Some(state));
}

#[test]
fn wire_record_and_link_agree_on_the_same_state() {
    // The link pipeline is codec + transport; whatever the codec round-trips
    // the link must round-trip too.
    let state = every_field_state();
    let codec = StateCodec::new();
    let record = codec.encode(&state);
    let via_codec = codec
        .decode(&serde_json::Value::Object(record))
        .unwrap();

    let build = builder().build(&state, BASE_URL).unwrap();
    let via_link = builder().parse(&build.url).unwrap().unwrap();
    assert_eq!(via_codec, via_link);
}

#[test]
fn foreign_query_parameters_do_not_disturb_parsing() {
    let state = every_field_state();
    let build = builder().build(&state, BASE_URL).unwrap();
    let noisy = format!("{}&utm_source=kakao&v=2", build.url);
    let parsed = builder().parse(&noisy).unwrap();
    assert_eq!(parsed, Some(state));
}

#[test]
fn truncated_payload_is_rejected_whole() {
    let state = every_field_state();
    let build = builder().build(&state, BASE_URL).unwrap();
    // Chop the tail off the payload: decompression must fail as a unit,
    // never yielding a partially populated state.
    let truncated: String = build.url.chars().take(build.url.len() - 24).collect();
    let err = builder().parse(&truncated).unwrap_err();
    assert!(matches!(err, ShareLinkError::InvalidShareLink(_)));
}
