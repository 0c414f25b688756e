//! Signature registry for contract, function, event, and opcode lookup
//!
//! The registry is the leaf every other component classifies against:
//! - contract address -> name and tracked flag
//! - 4-byte selector -> function name and category
//! - event topic0 -> event name and decoder kind
//! - opcode mnemonic -> one of ten fixed category groups
//!
//! Selectors and topics are derived from canonical signature strings
//! with `keccak256` at construction time, so the tables cannot drift
//! from the signatures they claim to describe. The default instance
//! covers the PYUSD contract set plus the standard ERC-20 surface;
//! builder methods extend it to any contract set.

use std::collections::HashMap;

use alloy::primitives::{address, keccak256, Address, B256};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::types::FunctionCategory;

/// PYUSD token contract (proxy) on Ethereum mainnet
pub const PYUSD_ADDRESS: Address = address!("6c3ea9036406852006290770bedfcaba0e23a0e8");

/// Shared default registry seeded with the PYUSD contract set
pub static DEFAULT_REGISTRY: Lazy<SignatureRegistry> = Lazy::new(SignatureRegistry::pyusd_mainnet);

/// Metadata for a registered contract
#[derive(Debug, Clone, Serialize)]
pub struct ContractInfo {
    /// Human-readable contract name
    pub name: String,
    /// Whether calls into this contract count toward tracked metrics
    pub tracked: bool,
}

/// Metadata for a registered function selector
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSig {
    /// Bare function name (e.g. "transfer")
    pub name: String,
    /// Canonical signature the selector was derived from
    pub signature: String,
    /// Functional classification
    pub category: FunctionCategory,
}

/// Decoder kind for a registered event topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `Transfer(address indexed, address indexed, uint256)`
    Transfer,
    /// `Approval(address indexed, address indexed, uint256)`
    Approval,
    /// Known event without a field decoder
    Other,
}

/// Metadata for a registered event topic
#[derive(Debug, Clone, Serialize)]
pub struct EventSig {
    /// Event name (e.g. "Transfer")
    pub name: String,
    /// Which decoder applies to this event's fields
    pub kind: EventKind,
}

/// Opcode category groups for gas breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcodeCategory {
    Arithmetic,
    Comparison,
    Bitwise,
    Memory,
    Storage,
    Flow,
    Stack,
    Environment,
    System,
    Logging,
    Other,
}

impl OpcodeCategory {
    /// Stable snake_case label, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            OpcodeCategory::Arithmetic => "arithmetic",
            OpcodeCategory::Comparison => "comparison",
            OpcodeCategory::Bitwise => "bitwise",
            OpcodeCategory::Memory => "memory",
            OpcodeCategory::Storage => "storage",
            OpcodeCategory::Flow => "flow",
            OpcodeCategory::Stack => "stack",
            OpcodeCategory::Environment => "environment",
            OpcodeCategory::System => "system",
            OpcodeCategory::Logging => "logging",
            OpcodeCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for OpcodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First 4 bytes of the keccak256 hash of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Full keccak256 hash of a canonical event signature (topic0)
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Static lookup tables for trace classification
///
/// Pure data: construction builds the maps once, lookups never mutate.
/// Cloning is cheap enough for per-analysis ownership, but components
/// normally borrow a shared instance.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    contracts: HashMap<Address, ContractInfo>,
    functions: HashMap<[u8; 4], FunctionSig>,
    events: HashMap<B256, EventSig>,
}

impl SignatureRegistry {
    /// Empty registry; every lookup resolves to unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the PYUSD mainnet contract set
    ///
    /// Covers the ERC-20 surface plus the Paxos-style supply-control
    /// and asset-protection functions PYUSD exposes.
    pub fn pyusd_mainnet() -> Self {
        let mut registry = Self::new()
            .with_contract(PYUSD_ADDRESS, "PYUSD Token", true)
            // ERC-20 movement and allowance surface
            .with_function("transfer(address,uint256)", FunctionCategory::TokenMovement)
            .with_function(
                "transferFrom(address,address,uint256)",
                FunctionCategory::TokenMovement,
            )
            .with_function("approve(address,uint256)", FunctionCategory::Allowance)
            .with_function(
                "increaseApproval(address,uint256)",
                FunctionCategory::Allowance,
            )
            .with_function(
                "decreaseApproval(address,uint256)",
                FunctionCategory::Allowance,
            )
            // Supply control
            .with_function("mint(address,uint256)", FunctionCategory::SupplyChange)
            .with_function("burn(uint256)", FunctionCategory::SupplyChange)
            .with_function("increaseSupply(uint256)", FunctionCategory::SupplyChange)
            .with_function("decreaseSupply(uint256)", FunctionCategory::SupplyChange)
            // Administration
            .with_function("pause()", FunctionCategory::Admin)
            .with_function("unpause()", FunctionCategory::Admin)
            .with_function("freeze(address)", FunctionCategory::Admin)
            .with_function("unfreeze(address)", FunctionCategory::Admin)
            .with_function("wipeFrozenAddress(address)", FunctionCategory::Admin)
            .with_function("transferOwnership(address)", FunctionCategory::Admin)
            .with_function("claimOwnership()", FunctionCategory::Admin)
            .with_function("setSupplyController(address)", FunctionCategory::Admin)
            .with_function("setAssetProtectionRole(address)", FunctionCategory::Admin)
            // Read-only accessors
            .with_function("balanceOf(address)", FunctionCategory::View)
            .with_function("allowance(address,address)", FunctionCategory::View)
            .with_function("totalSupply()", FunctionCategory::View)
            .with_function("decimals()", FunctionCategory::View)
            .with_function("symbol()", FunctionCategory::View)
            .with_function("name()", FunctionCategory::View)
            .with_function("paused()", FunctionCategory::View)
            .with_function("isFrozen(address)", FunctionCategory::View);

        registry = registry
            .with_event(
                "Transfer(address,address,uint256)",
                EventKind::Transfer,
            )
            .with_event(
                "Approval(address,address,uint256)",
                EventKind::Approval,
            )
            .with_event("SupplyIncreased(address,uint256)", EventKind::Other)
            .with_event("SupplyDecreased(address,uint256)", EventKind::Other)
            .with_event("AddressFrozen(address)", EventKind::Other)
            .with_event("AddressUnfrozen(address)", EventKind::Other)
            .with_event("OwnershipTransferred(address,address)", EventKind::Other)
            .with_event("Pause()", EventKind::Other)
            .with_event("Unpause()", EventKind::Other);

        registry
    }

    /// Register a contract address
    pub fn with_contract(mut self, address: Address, name: &str, tracked: bool) -> Self {
        self.contracts.insert(
            address,
            ContractInfo {
                name: name.to_string(),
                tracked,
            },
        );
        self
    }

    /// Register a function by canonical signature
    ///
    /// The selector is computed from the signature; the name is the
    /// text before the parameter list.
    pub fn with_function(mut self, signature: &str, category: FunctionCategory) -> Self {
        let name = signature
            .split('(')
            .next()
            .unwrap_or(signature)
            .to_string();
        self.functions.insert(
            selector(signature),
            FunctionSig {
                name,
                signature: signature.to_string(),
                category,
            },
        );
        self
    }

    /// Register an event by canonical signature
    pub fn with_event(mut self, signature: &str, kind: EventKind) -> Self {
        let name = signature
            .split('(')
            .next()
            .unwrap_or(signature)
            .to_string();
        self.events
            .insert(event_topic(signature), EventSig { name, kind });
        self
    }

    /// Look up a contract by address
    pub fn contract(&self, address: &Address) -> Option<&ContractInfo> {
        self.contracts.get(address)
    }

    /// Resolve a contract name, degrading to a placeholder
    pub fn contract_name(&self, address: &Address) -> String {
        self.contracts
            .get(address)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| "Unknown Contract".to_string())
    }

    /// Whether an address belongs to the tracked contract set
    pub fn is_tracked(&self, address: &Address) -> bool {
        self.contracts
            .get(address)
            .is_some_and(|info| info.tracked)
    }

    /// Look up a function by its 4-byte selector
    pub fn function(&self, selector: &[u8; 4]) -> Option<&FunctionSig> {
        self.functions.get(selector)
    }

    /// Extract and resolve the selector from a hex-encoded call input
    ///
    /// Returns `None` when the input is shorter than a selector
    /// (a native transfer) or the selector is unregistered.
    pub fn function_for_input(&self, input: &str) -> Option<&FunctionSig> {
        let sel = input_selector(input)?;
        self.functions.get(&sel)
    }

    /// Look up an event by its topic0 hash
    pub fn event(&self, topic0: &B256) -> Option<&EventSig> {
        self.events.get(topic0)
    }
}

/// Extract the raw 4-byte selector from a hex-encoded call input
///
/// Requires at least 10 hex chars (`0x` + 8 digits); returns `None`
/// for shorter or non-hex inputs.
pub fn input_selector(input: &str) -> Option<[u8; 4]> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() < 8 {
        return None;
    }
    let bytes = alloy::primitives::hex::decode(&digits[..8]).ok()?;
    Some([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Classify an opcode mnemonic into its category group
///
/// `PUSHn`, `DUPn`, `SWAPn`, and `LOGn` families match by prefix;
/// anything unrecognized falls back to [`OpcodeCategory::Other`].
pub fn categorize_opcode(op: &str) -> OpcodeCategory {
    match op {
        "ADD" | "MUL" | "SUB" | "DIV" | "SDIV" | "MOD" | "SMOD" | "ADDMOD" | "MULMOD" | "EXP"
        | "SIGNEXTEND" | "KECCAK256" | "SHA3" => OpcodeCategory::Arithmetic,
        "LT" | "GT" | "SLT" | "SGT" | "EQ" | "ISZERO" => OpcodeCategory::Comparison,
        "AND" | "OR" | "XOR" | "NOT" | "BYTE" | "SHL" | "SHR" | "SAR" => OpcodeCategory::Bitwise,
        "MLOAD" | "MSTORE" | "MSTORE8" | "MSIZE" | "MCOPY" => OpcodeCategory::Memory,
        "SLOAD" | "SSTORE" | "TLOAD" | "TSTORE" => OpcodeCategory::Storage,
        "JUMP" | "JUMPI" | "JUMPDEST" | "PC" | "STOP" | "RETURN" | "REVERT" | "INVALID" => {
            OpcodeCategory::Flow
        }
        "POP" => OpcodeCategory::Stack,
        "ADDRESS" | "BALANCE" | "ORIGIN" | "CALLER" | "CALLVALUE" | "CALLDATALOAD"
        | "CALLDATASIZE" | "CALLDATACOPY" | "CODESIZE" | "CODECOPY" | "GASPRICE"
        | "EXTCODESIZE" | "EXTCODECOPY" | "RETURNDATASIZE" | "RETURNDATACOPY" | "EXTCODEHASH"
        | "BLOCKHASH" | "COINBASE" | "TIMESTAMP" | "NUMBER" | "DIFFICULTY" | "PREVRANDAO"
        | "GASLIMIT" | "CHAINID" | "SELFBALANCE" | "BASEFEE" | "BLOBHASH" | "BLOBBASEFEE"
        | "GAS" => OpcodeCategory::Environment,
        "CREATE" | "CREATE2" | "CALL" | "CALLCODE" | "DELEGATECALL" | "STATICCALL"
        | "SELFDESTRUCT" => OpcodeCategory::System,
        _ if op.starts_with("PUSH") || op.starts_with("DUP") || op.starts_with("SWAP") => {
            OpcodeCategory::Stack
        }
        _ if op.starts_with("LOG") => OpcodeCategory::Logging,
        _ => OpcodeCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_selector_matches_known_value() {
        // keccak256("transfer(address,uint256)") starts with a9059cbb
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            selector("transferFrom(address,address,uint256)"),
            [0x23, 0xb8, 0x72, 0xdd]
        );
    }

    #[test]
    fn transfer_topic_matches_known_value() {
        let topic = event_topic("Transfer(address,address,uint256)");
        assert_eq!(
            format!("{topic}"),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn default_registry_tracks_pyusd() {
        let registry = SignatureRegistry::pyusd_mainnet();
        assert!(registry.is_tracked(&PYUSD_ADDRESS));
        assert_eq!(registry.contract_name(&PYUSD_ADDRESS), "PYUSD Token");
        assert_eq!(
            registry.contract_name(&Address::ZERO),
            "Unknown Contract"
        );
    }

    #[test]
    fn resolves_functions_from_input() {
        let registry = SignatureRegistry::pyusd_mainnet();

        let sig = registry
            .function_for_input("0xa9059cbb000000000000000000000000")
            .expect("transfer should resolve");
        assert_eq!(sig.name, "transfer");
        assert_eq!(sig.category, FunctionCategory::TokenMovement);

        // Too short for a selector
        assert!(registry.function_for_input("0x").is_none());
        // Unregistered selector
        assert!(registry.function_for_input("0xdeadbeef").is_none());
    }

    #[test]
    fn opcode_categories_cover_families() {
        assert_eq!(categorize_opcode("ADD"), OpcodeCategory::Arithmetic);
        assert_eq!(categorize_opcode("SSTORE"), OpcodeCategory::Storage);
        assert_eq!(categorize_opcode("PUSH32"), OpcodeCategory::Stack);
        assert_eq!(categorize_opcode("DUP16"), OpcodeCategory::Stack);
        assert_eq!(categorize_opcode("LOG3"), OpcodeCategory::Logging);
        assert_eq!(categorize_opcode("DELEGATECALL"), OpcodeCategory::System);
        assert_eq!(categorize_opcode("TIMESTAMP"), OpcodeCategory::Environment);
        assert_eq!(categorize_opcode("SOMETHING"), OpcodeCategory::Other);
    }

    #[test]
    fn builder_extends_registry() {
        let custom = address!("00000000000000000000000000000000000000aa");
        let registry = SignatureRegistry::new()
            .with_contract(custom, "Custom Vault", true)
            .with_function("deposit(uint256)", FunctionCategory::TokenMovement);

        assert!(registry.is_tracked(&custom));
        assert!(registry
            .function(&selector("deposit(uint256)"))
            .is_some());
    }
}
