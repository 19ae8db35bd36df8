//! Raw log records and the typed lending events they classify into.

use alloy::primitives::{Address, B256};

/// One log record as delivered by the log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// `topics[0]` is the event signature; the rest are indexed parameters.
    pub topics: Vec<B256>,
    pub block_number: u64,
    pub tx_hash: B256,
}

/// Chain context carried through classification unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    pub block_number: u64,
    pub tx_hash: B256,
}

/// Event discriminant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Supply,
    Borrow,
    Repay,
    LiquidationCall,
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
            Self::LiquidationCall => "liquidation_call",
            Self::Unknown => "unknown",
        }
    }
}

/// Aave V3 Pool event decoded from indexed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    Supply {
        meta: EventMeta,
        reserve: Address,
        on_behalf_of: Address,
        referral_code: u16,
    },
    Borrow {
        meta: EventMeta,
        reserve: Address,
        on_behalf_of: Address,
        referral_code: u16,
    },
    Repay {
        meta: EventMeta,
        reserve: Address,
        user: Address,
        repayer: Address,
    },
    LiquidationCall {
        meta: EventMeta,
        collateral_asset: Address,
        debt_asset: Address,
        user: Address,
    },
    /// Unrecognised signature, empty topic list, or too few topics for the
    /// matched signature.
    Unknown {
        meta: EventMeta,
        signature: Option<B256>,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Supply { .. } => EventKind::Supply,
            Self::Borrow { .. } => EventKind::Borrow,
            Self::Repay { .. } => EventKind::Repay,
            Self::LiquidationCall { .. } => EventKind::LiquidationCall,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::Supply { meta, .. }
            | Self::Borrow { meta, .. }
            | Self::Repay { meta, .. }
            | Self::LiquidationCall { meta, .. }
            | Self::Unknown { meta, .. } => meta,
        }
    }
}
