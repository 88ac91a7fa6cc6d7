//! Collapse a query's transient fetch flags into a single render state

use serde::{Deserialize, Serialize};

/// Snapshot of a query's flags at render time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFlags {
    /// Whether the query holds non-empty data
    pub has_data: bool,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_fetched: bool,
    pub is_error: bool,
    /// HTTP status of the error, when the error came from a response
    pub error_status: Option<u16>,
    pub is_success: bool,
}

impl QueryFlags {
    /// Flags for a settled query that returned `len` items
    pub const fn settled(len: usize) -> Self {
        Self {
            has_data: len > 0,
            is_loading: false,
            is_fetching: false,
            is_fetched: true,
            is_error: false,
            error_status: None,
            is_success: true,
        }
    }

    /// Flags for a settled query that failed with `status`
    pub const fn failed(status: Option<u16>) -> Self {
        Self {
            has_data: false,
            is_loading: false,
            is_fetching: false,
            is_fetched: true,
            is_error: true,
            error_status: status,
            is_success: false,
        }
    }

    const fn is_not_found(&self) -> bool {
        matches!(self.error_status, Some(404))
    }
}

/// The four mutually exclusive render states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
    Loading,
    Error,
    Empty,
    Data,
}

impl RenderState {
    /// Decide the render state. 404 errors render as empty, never as error.
    pub const fn derive(flags: &QueryFlags) -> Self {
        if flags.is_loading || (flags.is_fetching && !flags.has_data) {
            Self::Loading
        } else if flags.is_error && !flags.is_not_found() {
            Self::Error
        } else if !flags.has_data {
            Self::Empty
        } else {
            Self::Data
        }
    }
}

/// Boolean view of [`RenderState`] as consumed by list screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub show_loader: bool,
    pub show_error: bool,
    pub show_no_data: bool,
    pub show_data: bool,
}

impl From<RenderState> for UiState {
    fn from(state: RenderState) -> Self {
        Self {
            show_loader: state == RenderState::Loading,
            show_error: state == RenderState::Error,
            show_no_data: state == RenderState::Empty,
            show_data: state == RenderState::Data,
        }
    }
}

impl UiState {
    pub const fn state(&self) -> RenderState {
        if self.show_loader {
            RenderState::Loading
        } else if self.show_error {
            RenderState::Error
        } else if self.show_no_data {
            RenderState::Empty
        } else {
            RenderState::Data
        }
    }
}

/// Map query flags to exactly one visible render state.
pub fn derive_ui_state(flags: &QueryFlags) -> UiState {
    RenderState::derive(flags).into()
}
