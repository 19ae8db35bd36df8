//! Maps raw Pool log records to typed lending events.
//!
//! Lookup is by `topics[0]` against a table of signature hashes computed once
//! from the canonical event signatures. Each entry carries the number of
//! topics its extractor needs; a shorter topic list is `Unknown`, never an
//! out-of-range read.

use std::collections::HashMap;
use std::sync::LazyLock;

use alloy::primitives::{keccak256, Address, B256};

use crate::types::{DomainEvent, EventKind, EventMeta, RawLog};

type Extractor = fn(&[B256], EventMeta) -> DomainEvent;

/// One recognised event signature.
#[derive(Clone, Copy)]
pub struct EventSpec {
    pub kind: EventKind,
    /// Canonical signature string, e.g. `Repay(address,address,address,uint256,bool)`.
    pub signature: &'static str,
    /// Signature topic plus indexed parameters.
    pub topic_count: usize,
    extract: Extractor,
}

impl std::fmt::Debug for EventSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSpec")
            .field("kind", &self.kind)
            .field("signature", &self.signature)
            .field("topic_count", &self.topic_count)
            .finish()
    }
}

const EVENT_SPECS: [EventSpec; 4] = [
    EventSpec {
        kind: EventKind::Supply,
        signature: "Supply(address,address,address,uint256,uint16)",
        topic_count: 4,
        extract: extract_supply,
    },
    EventSpec {
        kind: EventKind::Borrow,
        signature: "Borrow(address,address,address,uint256,uint8,uint256,uint16)",
        topic_count: 4,
        extract: extract_borrow,
    },
    EventSpec {
        kind: EventKind::Repay,
        signature: "Repay(address,address,address,uint256,bool)",
        topic_count: 4,
        extract: extract_repay,
    },
    EventSpec {
        kind: EventKind::LiquidationCall,
        signature: "LiquidationCall(address,address,address,uint256,uint256,address,bool)",
        topic_count: 4,
        extract: extract_liquidation_call,
    },
];

static SIGNATURES: LazyLock<HashMap<B256, EventSpec>> = LazyLock::new(|| {
    EVENT_SPECS
        .iter()
        .map(|spec| (keccak256(spec.signature.as_bytes()), *spec))
        .collect()
});

/// Precomputed signature hash → event spec table.
pub fn event_signatures() -> &'static HashMap<B256, EventSpec> {
    &SIGNATURES
}

/// Classify one log record. Never fails: anything unrecognised or malformed
/// becomes [`DomainEvent::Unknown`].
pub fn classify(log: &RawLog) -> DomainEvent {
    let meta = EventMeta {
        block_number: log.block_number,
        tx_hash: log.tx_hash,
    };

    let Some(signature) = log.topics.first().copied() else {
        return DomainEvent::Unknown { meta, signature: None };
    };

    match SIGNATURES.get(&signature) {
        Some(spec) if log.topics.len() >= spec.topic_count => (spec.extract)(&log.topics, meta),
        _ => DomainEvent::Unknown {
            meta,
            signature: Some(signature),
        },
    }
}

// ---------------------------------------------------------------------------
// Extractors (topic count already checked)
// ---------------------------------------------------------------------------

fn topic_address(topic: &B256) -> Address {
    Address::from_word(*topic)
}

fn topic_u16(topic: &B256) -> u16 {
    u16::from_be_bytes([topic[30], topic[31]])
}

fn extract_supply(topics: &[B256], meta: EventMeta) -> DomainEvent {
    DomainEvent::Supply {
        meta,
        reserve: topic_address(&topics[1]),
        on_behalf_of: topic_address(&topics[2]),
        referral_code: topic_u16(&topics[3]),
    }
}

fn extract_borrow(topics: &[B256], meta: EventMeta) -> DomainEvent {
    DomainEvent::Borrow {
        meta,
        reserve: topic_address(&topics[1]),
        on_behalf_of: topic_address(&topics[2]),
        referral_code: topic_u16(&topics[3]),
    }
}

fn extract_repay(topics: &[B256], meta: EventMeta) -> DomainEvent {
    DomainEvent::Repay {
        meta,
        reserve: topic_address(&topics[1]),
        user: topic_address(&topics[2]),
        repayer: topic_address(&topics[3]),
    }
}

fn extract_liquidation_call(topics: &[B256], meta: EventMeta) -> DomainEvent {
    DomainEvent::LiquidationCall {
        meta,
        collateral_asset: topic_address(&topics[1]),
        debt_asset: topic_address(&topics[2]),
        user: topic_address(&topics[3]),
    }
}
