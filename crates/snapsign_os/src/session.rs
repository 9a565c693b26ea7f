#![forbid(unsafe_code)]

use snapsign_engines::pricing::{PricingConfig, PricingEngine};
use snapsign_kernel_contracts::catalog::PricingCatalog;
use snapsign_kernel_contracts::state::{
    ContractState, CustomOption, CustomOptionId, OptionSign, SessionMode,
};
use snapsign_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};

use crate::share_link::{ShareLinkBuild, ShareLinkBuilder, ShareLinkError};

pub mod reason_codes {
    use snapsign_kernel_contracts::ReasonCodeId;

    // Session reason-code namespace. Values are placeholders until the
    // global registry is formalized.
    pub const SESSION_OK_START: ReasonCodeId = ReasonCodeId(0x5345_0001);
    pub const SESSION_OK_APPLY: ReasonCodeId = ReasonCodeId(0x5345_0002);
    pub const SESSION_OK_REPRICE: ReasonCodeId = ReasonCodeId(0x5345_0003);
    pub const SESSION_OK_SHARE_BUILD: ReasonCodeId = ReasonCodeId(0x5345_0004);
    pub const SESSION_OK_RECEIVED_LOAD: ReasonCodeId = ReasonCodeId(0x5345_0005);
    pub const SESSION_OK_AUTHORING_LOAD: ReasonCodeId = ReasonCodeId(0x5345_0006);
    pub const SESSION_OK_EXPORT_BEGIN: ReasonCodeId = ReasonCodeId(0x5345_0007);
    pub const SESSION_OK_EXPORT_DONE: ReasonCodeId = ReasonCodeId(0x5345_0008);
    pub const SESSION_REFUSE_EXPORT_IN_FLIGHT: ReasonCodeId = ReasonCodeId(0x5345_00F1);
    pub const SESSION_REFUSE_INBOUND_LINK: ReasonCodeId = ReasonCodeId(0x5345_00F2);
    pub const SESSION_REFUSE_EXPORT_REENTRY: ReasonCodeId = ReasonCodeId(0x5345_00F3);
    pub const SESSION_ERR_EXPORT_FAILED: ReasonCodeId = ReasonCodeId(0x5345_00F4);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    ContractorName,
    Venue,
    Contact,
    WeddingDate,
    WeddingTime,
}

impl TextField {
    pub fn as_str(self) -> &'static str {
        match self {
            TextField::ContractorName => "contractor_name",
            TextField::Venue => "venue",
            TextField::Contact => "contact",
            TextField::WeddingDate => "wedding_date",
            TextField::WeddingTime => "wedding_time",
        }
    }
}

/// One discrete operator action. Every variant replaces the whole snapshot;
/// there is no partial mutation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
    EditText { field: TextField, value: String },
    SelectPackage { key: String },
    SelectOption { key: String },
    ToggleCustomOptionGate { enabled: bool },
    AddCustomOption {
        name: String,
        price: String,
        sign: OptionSign,
    },
    UpdateCustomOption {
        id: CustomOptionId,
        name: String,
        price: String,
        sign: OptionSign,
    },
    RemoveCustomOption { id: CustomOptionId },
    ToggleDiscount { id: String },
    CaptureSignature { payload: String },
    ClearSignature,
}

impl ContractEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ContractEvent::EditText { .. } => "edit_text",
            ContractEvent::SelectPackage { .. } => "select_package",
            ContractEvent::SelectOption { .. } => "select_option",
            ContractEvent::ToggleCustomOptionGate { .. } => "toggle_custom_option_gate",
            ContractEvent::AddCustomOption { .. } => "add_custom_option",
            ContractEvent::UpdateCustomOption { .. } => "update_custom_option",
            ContractEvent::RemoveCustomOption { .. } => "remove_custom_option",
            ContractEvent::ToggleDiscount { .. } => "toggle_discount",
            ContractEvent::CaptureSignature { .. } => "capture_signature",
            ContractEvent::ClearSignature => "clear_signature",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot was replaced. `repriced` reports whether the reactive
    /// recompute actually rewrote the cached price string; a repriced apply
    /// is the one permitted derived update per triggering event.
    Applied { repriced: bool },
    RefusedExportInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportGate {
    Begun,
    AlreadyInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub seq: u64,
    pub reason_code: ReasonCodeId,
    pub note: String,
}

/// The outcome of loading a session against an inbound URL. A rejected
/// payload still yields a usable session: a fresh authoring one, with the
/// rejection surfaced alongside.
#[derive(Debug)]
pub struct SessionLoad {
    pub session: ContractSession,
    pub rejected: Option<ShareLinkError>,
}

/// Single-threaded contract session: owns the state snapshot, dispatches
/// events, reprices reactively, and gates mutation while an export is in
/// flight. The mode is fixed at load time and never changes afterwards.
#[derive(Debug, Clone)]
pub struct ContractSession {
    catalog: PricingCatalog,
    state: ContractState,
    mode: SessionMode,
    pricing: PricingEngine,
    next_custom_option_id: u64,
    export_in_flight: bool,
    journal: Vec<SessionRecord>,
    next_seq: u64,
}

impl ContractSession {
    pub fn new_authoring(catalog: PricingCatalog) -> Result<Self, ContractViolation> {
        catalog.validate()?;
        let state = ContractState::authoring_v1(&catalog)?;
        let mut session = Self {
            catalog,
            state,
            mode: SessionMode::Authoring,
            pricing: PricingEngine::new(PricingConfig::mvp_v1()),
            next_custom_option_id: 1,
            export_in_flight: false,
            journal: Vec::new(),
            next_seq: 1,
        };
        session.record(reason_codes::SESSION_OK_START, "authoring session".to_string());
        let mut seeded = session.state.clone();
        if session.reprice_into(&mut seeded) {
            session.state = seeded;
            session.record(reason_codes::SESSION_OK_REPRICE, "initial price".to_string());
        }
        Ok(session)
    }

    /// Loads a session against the page URL. A `data` payload replaces the
    /// state wholesale and fixes the mode to received; its absence, or any
    /// rejection of the payload, leaves a fresh authoring session.
    pub fn open_v1(
        catalog: PricingCatalog,
        builder: &ShareLinkBuilder,
        link: &str,
    ) -> Result<SessionLoad, ContractViolation> {
        let mut session = Self::new_authoring(catalog)?;

        match builder.parse(link) {
            Ok(None) => {
                session.record(
                    reason_codes::SESSION_OK_AUTHORING_LOAD,
                    "no inbound payload".to_string(),
                );
                Ok(SessionLoad {
                    session,
                    rejected: None,
                })
            }
            Ok(Some(inbound)) => {
                if let Err(violation) = inbound.validate() {
                    session.record(
                        reason_codes::SESSION_REFUSE_INBOUND_LINK,
                        format!("inbound state rejected: {violation:?}"),
                    );
                    return Ok(SessionLoad {
                        session,
                        rejected: Some(ShareLinkError::MalformedShareData(format!(
                            "inbound state contract: {violation:?}"
                        ))),
                    });
                }
                session.state = inbound;
                session.mode = SessionMode::Received;
                session.next_custom_option_id = session
                    .state
                    .max_custom_option_id()
                    .map(|id| id.0 + 1)
                    .unwrap_or(session.next_custom_option_id)
                    .max(session.next_custom_option_id);
                let mut repriced_state = session.state.clone();
                if session.reprice_into(&mut repriced_state) {
                    session.state = repriced_state;
                    session.record(
                        reason_codes::SESSION_OK_REPRICE,
                        "inbound price restated".to_string(),
                    );
                }
                session.record(
                    reason_codes::SESSION_OK_RECEIVED_LOAD,
                    "received contract".to_string(),
                );
                Ok(SessionLoad {
                    session,
                    rejected: None,
                })
            }
            Err(err) => {
                session.record(
                    reason_codes::SESSION_REFUSE_INBOUND_LINK,
                    format!("inbound link rejected: {err}"),
                );
                Ok(SessionLoad {
                    session,
                    rejected: Some(err),
                })
            }
        }
    }

    pub fn state(&self) -> &ContractState {
        &self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    pub fn journal(&self) -> &[SessionRecord] {
        &self.journal
    }

    pub fn export_in_flight(&self) -> bool {
        self.export_in_flight
    }

    pub fn apply(&mut self, event: ContractEvent) -> Result<ApplyOutcome, ContractViolation> {
        if self.export_in_flight {
            self.record(
                reason_codes::SESSION_REFUSE_EXPORT_IN_FLIGHT,
                format!("refused {} during export", event.kind()),
            );
            return Ok(ApplyOutcome::RefusedExportInFlight);
        }

        let kind = event.kind();
        let mut next = self.state.clone();
        let mut allocated_id: Option<u64> = None;

        match event {
            ContractEvent::EditText { field, value } => match field {
                TextField::ContractorName => next.contractor_name = value,
                TextField::Venue => next.venue = value,
                TextField::Contact => next.contact = value,
                TextField::WeddingDate => next.wedding_date = value,
                TextField::WeddingTime => next.wedding_time = value,
            },
            ContractEvent::SelectPackage { key } => next.package_config = key,
            ContractEvent::SelectOption { key } => next.options = key,
            ContractEvent::ToggleCustomOptionGate { enabled } => {
                next.has_custom_option = enabled;
            }
            ContractEvent::AddCustomOption { name, price, sign } => {
                let id = self.next_custom_option_id;
                allocated_id = Some(id);
                next.custom_options.push(CustomOption {
                    id: CustomOptionId(id),
                    name,
                    price,
                    sign,
                });
            }
            ContractEvent::UpdateCustomOption {
                id,
                name,
                price,
                sign,
            } => {
                if let Some(option) = next.custom_options.iter_mut().find(|o| o.id == id) {
                    option.name = name;
                    option.price = price;
                    option.sign = sign;
                }
            }
            ContractEvent::RemoveCustomOption { id } => {
                next.custom_options.retain(|o| o.id != id);
            }
            ContractEvent::ToggleDiscount { id } => {
                if next.discount_items.iter().any(|existing| existing == &id) {
                    next.discount_items.retain(|existing| existing != &id);
                } else {
                    next.discount_items.push(id);
                }
            }
            ContractEvent::CaptureSignature { payload } => {
                next.signature = Some(payload);
            }
            ContractEvent::ClearSignature => next.signature = None,
        }

        // Fail closed: a snapshot that breaks the contract never replaces
        // the live state, and never consumes an allocated id.
        next.validate()?;

        let repriced = self.reprice_into(&mut next);
        self.state = next;
        if let Some(id) = allocated_id {
            // Ids are never reused, even after the option is removed.
            self.next_custom_option_id = id + 1;
        }
        self.record(reason_codes::SESSION_OK_APPLY, format!("applied {kind}"));
        if repriced {
            self.record(
                reason_codes::SESSION_OK_REPRICE,
                format!("price restated as {}", self.state.final_price),
            );
        }
        Ok(ApplyOutcome::Applied { repriced })
    }

    pub fn build_share_link(
        &mut self,
        builder: &ShareLinkBuilder,
        base_url: &str,
    ) -> Result<ShareLinkBuild, ShareLinkError> {
        let build = builder.build(&self.state, base_url)?;
        self.record(
            reason_codes::SESSION_OK_SHARE_BUILD,
            format!("share payload {}", build.payload_hash),
        );
        Ok(build)
    }

    /// Export operates on a point-in-time snapshot; mutating events are
    /// refused until the caller reports the export finished.
    pub fn begin_export(&mut self) -> ExportGate {
        if self.export_in_flight {
            self.record(
                reason_codes::SESSION_REFUSE_EXPORT_REENTRY,
                "export already in flight".to_string(),
            );
            return ExportGate::AlreadyInFlight;
        }
        self.export_in_flight = true;
        self.record(reason_codes::SESSION_OK_EXPORT_BEGIN, "export begun".to_string());
        ExportGate::Begun
    }

    /// Restores interactivity whether the export succeeded or failed. The
    /// authoring state is untouched either way.
    pub fn end_export(&mut self, succeeded: bool) {
        self.export_in_flight = false;
        if succeeded {
            self.record(reason_codes::SESSION_OK_EXPORT_DONE, "export done".to_string());
        } else {
            self.record(
                reason_codes::SESSION_ERR_EXPORT_FAILED,
                "export failed, interactivity restored".to_string(),
            );
        }
    }

    fn reprice_into(&self, state: &mut ContractState) -> bool {
        let quote = self.pricing.quote(state, &self.catalog);
        if quote.restates(&state.final_price) {
            state.final_price = quote.formatted;
            true
        } else {
            false
        }
    }

    fn record(&mut self, reason_code: ReasonCodeId, note: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.journal.push(SessionRecord {
            seq,
            reason_code,
            note,
        });
    }
}
