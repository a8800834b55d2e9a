//! # Oracle IR — Gate Descriptors and the 8-bit Register Evaluator
//!
//! An oracle is an ordered list of gates applied to a single 8-bit register.
//! Every gate reads two bits of the register, combines them with one of four
//! operations and writes the result into a third bit. Gates run strictly in
//! sequence, so a gate sees whatever the previous gate left behind.
//!
//! ## Text Format
//!
//! ```text
//! [[op,p1,p2,p3],[op,p1,p2,p3],...]
//! ```
//!
//! `op` is `0` (NEGATE), `1` (AND), `2` (OR) or `3` (XOR). `p1` and `p2` are
//! the operand bits, `p3` the target bit, all in `0..=7`.
//!
//! ## Example
//!
//! ```rust
//! use gate_oracle::Configuration;
//!
//! let config: Configuration = "[[1,0,1,2]]".parse().unwrap();
//!
//! assert_eq!(config.evaluate(0b0001_0011), 0b0001_0111);
//! assert_eq!(config.evaluate(0b0001_0001), 0b0001_0001);
//! assert_eq!(config.to_string(), "[[1,0,1,2]]");
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hex-encoded BLAKE3 digest of a configuration's canonical text.
pub type ConfigurationHash = String;

/// Width of the register in bits.
pub const REGISTER_BITS: u8 = 8;

/// Number of distinct register values, i.e. the full input domain.
pub const INPUT_DOMAIN: usize = 1 << REGISTER_BITS;

/// Gate operation types.
///
/// The discriminants are the operation codes used by the text and raw
/// descriptor formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Operation {
    /// Write the inverse of bit `p1`; `p2` is ignored
    Negate = 0,
    /// Write `p1 & p2`
    And = 1,
    /// Write `p1 | p2`
    Or = 2,
    /// Write `p1 ^ p2`
    Xor = 3,
}

impl Operation {
    /// Every operation, in code order.
    pub const ALL: [Operation; 4] = [
        Operation::Negate,
        Operation::And,
        Operation::Or,
        Operation::Xor,
    ];

    /// Numeric code of this operation.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse an operation from its name (`not` is accepted for `negate`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "negate" | "not" => Some(Operation::Negate),
            "and" => Some(Operation::And),
            "or" => Some(Operation::Or),
            "xor" => Some(Operation::Xor),
            _ => None,
        }
    }

    /// Get canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Negate => "negate",
            Operation::And => "and",
            Operation::Or => "or",
            Operation::Xor => "xor",
        }
    }

    fn combine(self, val1: u8, val2: u8) -> u8 {
        match self {
            Operation::Negate => val1 ^ 1,
            Operation::And => val1 & val2,
            Operation::Or => val1 | val2,
            Operation::Xor => val1 ^ val2,
        }
    }
}

impl TryFrom<u32> for Operation {
    type Error = DescriptorError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operation::Negate),
            1 => Ok(Operation::And),
            2 => Ok(Operation::Or),
            3 => Ok(Operation::Xor),
            other => Err(DescriptorError::UnknownOperation(other)),
        }
    }
}

/// A single gate: `param3 := op(bit(param1), bit(param2))`.
///
/// Fields are private; every constructor validates the bit indices, so a
/// `Gate` in hand is always safe to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct Gate {
    op: Operation,
    param1: u8,
    param2: u8,
    param3: u8,
}

/// Errors for a malformed gate descriptor.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorError {
    /// Operation code outside the four known operations
    #[error("unknown operation code {0}")]
    UnknownOperation(u32),
    /// Bit index outside `0..=7`
    #[error("{field} = {value} is not a bit index in 0..=7")]
    BitIndexOutOfRange { field: &'static str, value: u32 },
}

/// Errors that can occur when building a configuration from text or raw
/// descriptors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Input was empty or whitespace-only
    #[error("empty input")]
    Empty,
    /// Brackets, commas or numbers are malformed
    #[error("syntax error: {0}")]
    Syntax(String),
    /// A descriptor parsed but carries an invalid field
    #[error("descriptor {index}: {source}")]
    Descriptor {
        index: usize,
        #[source]
        source: DescriptorError,
    },
}

impl Gate {
    pub fn new(op: Operation, param1: u8, param2: u8, param3: u8) -> Result<Self, DescriptorError> {
        Ok(Gate {
            op,
            param1: check_bit_index("param1", param1.into())?,
            param2: check_bit_index("param2", param2.into())?,
            param3: check_bit_index("param3", param3.into())?,
        })
    }

    /// Build a gate from raw `(operation, param1, param2, param3)` codes.
    pub fn from_codes(codes: [u32; 4]) -> Result<Self, DescriptorError> {
        let [op, param1, param2, param3] = codes;
        Ok(Gate {
            op: Operation::try_from(op)?,
            param1: check_bit_index("param1", param1)?,
            param2: check_bit_index("param2", param2)?,
            param3: check_bit_index("param3", param3)?,
        })
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn param1(&self) -> u8 {
        self.param1
    }

    pub fn param2(&self) -> u8 {
        self.param2
    }

    pub fn param3(&self) -> u8 {
        self.param3
    }

    /// The gate as `[op, param1, param2, param3]`.
    pub fn to_codes(&self) -> [u8; 4] {
        [self.op.code(), self.param1, self.param2, self.param3]
    }

    /// Apply this gate to `register` and return the new register value.
    pub fn apply(&self, register: u8) -> u8 {
        apply_gate(register, self)
    }

    fn random<R: Rng>(rng: &mut R, operations: &[Operation]) -> Self {
        let operations = if operations.is_empty() {
            &Operation::ALL[..]
        } else {
            operations
        };
        Gate {
            op: operations[rng.gen_range(0..operations.len())],
            param1: rng.gen_range(0..REGISTER_BITS),
            param2: rng.gen_range(0..REGISTER_BITS),
            param3: rng.gen_range(0..REGISTER_BITS),
        }
    }
}

impl TryFrom<[u32; 4]> for Gate {
    type Error = DescriptorError;

    fn try_from(codes: [u32; 4]) -> Result<Self, Self::Error> {
        Gate::from_codes(codes)
    }
}

impl TryFrom<[u8; 4]> for Gate {
    type Error = DescriptorError;

    fn try_from(codes: [u8; 4]) -> Result<Self, Self::Error> {
        Gate::from_codes(codes.map(u32::from))
    }
}

impl From<Gate> for [u32; 4] {
    fn from(gate: Gate) -> Self {
        gate.to_codes().map(u32::from)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{}]",
            self.op.code(),
            self.param1,
            self.param2,
            self.param3
        )
    }
}

/// An oracle — an ordered sequence of gates over one 8-bit register.
///
/// # Example
///
/// ```rust
/// use gate_oracle::{Configuration, Gate, Operation};
///
/// let flip_low = Configuration::new(vec![
///     Gate::new(Operation::Negate, 0, 0, 0).unwrap(),
/// ]);
///
/// assert_eq!(flip_low.evaluate(0b0000_0000), 0b0000_0001);
/// assert_eq!(flip_low.evaluate(0b0000_0001), 0b0000_0000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    gates: Vec<Gate>,
}

impl Configuration {
    pub fn new(gates: Vec<Gate>) -> Self {
        Configuration { gates }
    }

    /// Validate externally supplied descriptors and build a configuration.
    pub fn from_raw(raw: &[[u8; 4]]) -> Result<Self, ConfigurationError> {
        let gates = raw
            .iter()
            .enumerate()
            .map(|(index, codes)| {
                Gate::try_from(*codes).map_err(|source| ConfigurationError::Descriptor { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Configuration { gates })
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn evaluate(&self, input: u8) -> u8 {
        evaluate(input, &self.gates)
    }

    /// Outputs for every input, indexed by input value.
    pub fn truth_table(&self) -> [u8; INPUT_DOMAIN] {
        let mut table = [0u8; INPUT_DOMAIN];
        for (input, slot) in (0..=u8::MAX).zip(table.iter_mut()) {
            *slot = self.evaluate(input);
        }
        table
    }

    /// Number of inputs the configuration maps to themselves.
    pub fn fixed_points(&self) -> usize {
        (0..=u8::MAX)
            .filter(|&input| self.evaluate(input) == input)
            .count()
    }

    pub fn canonical_text(&self) -> String {
        self.to_string()
    }

    pub fn hash(&self) -> ConfigurationHash {
        let digest = blake3::hash(self.canonical_text().as_bytes());
        hex::encode(digest.as_bytes())
    }
}

impl From<Vec<Gate>> for Configuration {
    fn from(gates: Vec<Gate>) -> Self {
        Configuration { gates }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, gate) in self.gates.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", gate)?;
        }
        f.write_str("]")
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ConfigurationError::Empty);
        }
        let body = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| ConfigurationError::Syntax("expected outer [ ... ]".into()))?
            .trim();
        let mut gates = Vec::new();
        if body.is_empty() {
            return Ok(Configuration { gates });
        }
        let mut rest = body;
        loop {
            let index = gates.len();
            let open = rest.trim_start().strip_prefix('[').ok_or_else(|| {
                ConfigurationError::Syntax(format!("descriptor {}: expected [", index))
            })?;
            let close = open.find(']').ok_or_else(|| {
                ConfigurationError::Syntax(format!("descriptor {}: missing ]", index))
            })?;
            gates.push(parse_gate(&open[..close], index)?);
            let after = open[close + 1..].trim_start();
            if after.is_empty() {
                break;
            }
            rest = after.strip_prefix(',').ok_or_else(|| {
                ConfigurationError::Syntax(format!("descriptor {}: expected , after ]", index))
            })?;
        }
        Ok(Configuration { gates })
    }
}

fn parse_gate(inner: &str, index: usize) -> Result<Gate, ConfigurationError> {
    let fields: Vec<&str> = inner.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(ConfigurationError::Syntax(format!(
            "descriptor {}: expected 4 fields, got {}",
            index,
            fields.len()
        )));
    }
    let mut codes = [0u32; 4];
    for (slot, field) in codes.iter_mut().zip(&fields) {
        *slot = u32::from_str(field).map_err(|_| {
            ConfigurationError::Syntax(format!("descriptor {}: invalid field {:?}", index, field))
        })?;
    }
    Gate::from_codes(codes).map_err(|source| ConfigurationError::Descriptor { index, source })
}

fn check_bit_index(field: &'static str, value: u32) -> Result<u8, DescriptorError> {
    if value < u32::from(REGISTER_BITS) {
        Ok(value as u8)
    } else {
        Err(DescriptorError::BitIndexOutOfRange { field, value })
    }
}

fn bit(register: u8, index: u8) -> u8 {
    (register >> index) & 1
}

/// One evaluation step. Both operands are read before the target is written.
pub fn apply_gate(register: u8, gate: &Gate) -> u8 {
    let val1 = bit(register, gate.param1);
    let val2 = bit(register, gate.param2);
    let mask = 1u8 << gate.param3;
    if gate.op.combine(val1, val2) == 1 {
        register | mask
    } else {
        register & !mask
    }
}

/// Run `input` through `gates` in order.
pub fn evaluate(input: u8, gates: &[Gate]) -> u8 {
    gates.iter().fold(input, apply_gate)
}

/// Evaluate unvalidated `(operation, param1, param2, param3)` descriptors.
///
/// Nothing is evaluated unless every descriptor is valid.
pub fn evaluate_raw(input: u8, raw: &[[u8; 4]]) -> Result<u8, ConfigurationError> {
    Ok(Configuration::from_raw(raw)?.evaluate(input))
}

/// Sample `length` gates uniformly, with operations drawn from `operations`
/// (all four when the slice is empty).
pub fn random_configuration<R: Rng>(
    rng: &mut R,
    length: usize,
    operations: &[Operation],
) -> Configuration {
    let gates = (0..length).map(|_| Gate::random(rng, operations)).collect();
    Configuration { gates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn gate(codes: [u8; 4]) -> Gate {
        Gate::try_from(codes).unwrap()
    }

    #[test]
    fn negate_flips_target() {
        assert_eq!(evaluate(0b0000_0000, &[gate([0, 0, 0, 0])]), 0b0000_0001);
        assert_eq!(evaluate(0b0000_0001, &[gate([0, 0, 0, 0])]), 0b0000_0000);
    }

    #[test]
    fn and_truth_rows() {
        let g = [gate([1, 0, 1, 2])];
        assert_eq!(evaluate(0b0001_0000, &g), 0b0001_0000);
        assert_eq!(evaluate(0b0001_0001, &g), 0b0001_0001);
        assert_eq!(evaluate(0b0001_0010, &g), 0b0001_0010);
        assert_eq!(evaluate(0b0001_0011, &g), 0b0001_0111);
    }

    #[test]
    fn or_truth_rows() {
        let g = [gate([2, 0, 1, 2])];
        assert_eq!(evaluate(0b0001_0000, &g), 0b0001_0000);
        assert_eq!(evaluate(0b0001_0001, &g), 0b0001_0101);
        assert_eq!(evaluate(0b0001_0010, &g), 0b0001_0110);
        assert_eq!(evaluate(0b0001_0011, &g), 0b0001_0111);
    }

    #[test]
    fn xor_truth_rows() {
        let g = [gate([3, 0, 1, 2])];
        assert_eq!(evaluate(0b0001_0000, &g), 0b0001_0000);
        assert_eq!(evaluate(0b0001_0001, &g), 0b0001_0101);
        assert_eq!(evaluate(0b0001_0010, &g), 0b0001_0110);
        assert_eq!(evaluate(0b0001_0011, &g), 0b0001_0011);
    }

    #[test]
    fn target_clears_when_result_is_zero() {
        assert_eq!(evaluate(0b0000_0100, &[gate([1, 0, 1, 2])]), 0b0000_0000);
    }

    #[test]
    fn feedback_reads_written_bit() {
        // The second gate sees bit 0 as already flipped by the first.
        let config = Configuration::new(vec![gate([0, 0, 0, 0]), gate([2, 0, 0, 7])]);
        assert_eq!(config.evaluate(0b0000_0000), 0b1000_0001);
        assert_eq!(config.evaluate(0b0000_0001), 0b0000_0000);
    }

    #[test]
    fn empty_configuration_is_identity() {
        let config = Configuration::default();
        assert_eq!(config.fixed_points(), INPUT_DOMAIN);
        assert!(config.truth_table().iter().enumerate().all(|(i, &o)| i == o as usize));
    }

    #[test]
    fn fixed_points_of_known_configurations() {
        let c: Configuration = "[[2,4,6,3],[2,1,3,3],[2,2,3,6],[1,2,5,3]]".parse().unwrap();
        assert_eq!(c.fixed_points(), 72);
        let no_change: Configuration = "[[0,2,3,1],[0,5,7,2],[2,3,2,5],[2,5,6,5],[3,1,6,6],[2,7,4,7]]"
            .parse()
            .unwrap();
        assert_eq!(no_change.fixed_points(), 0);
    }

    #[test]
    fn display_has_no_spaces() {
        let config = Configuration::new(vec![gate([2, 4, 6, 3]), gate([1, 2, 5, 3])]);
        assert_eq!(config.to_string(), "[[2,4,6,3],[1,2,5,3]]");
        assert_eq!(Configuration::default().to_string(), "[]");
    }

    #[test]
    fn parse_canonical_idempotent() {
        let text = " [ [2, 4, 6, 3] ,[1,2,5,3]] ";
        let config: Configuration = text.parse().unwrap();
        let canon = config.canonical_text();
        assert_eq!(canon, "[[2,4,6,3],[1,2,5,3]]");
        let again: Configuration = canon.parse().unwrap();
        assert_eq!(config, again);
        assert_eq!("[ ]".parse::<Configuration>().unwrap(), Configuration::default());
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert_eq!("   ".parse::<Configuration>(), Err(ConfigurationError::Empty));
        for bad in ["[[0,0,0,0]", "[[0,0,0]]", "[[0,0,0,0],]", "[[0,0,0,0][1,1,1,1]]", "[[a,0,0,0]]", "[[3 1 1 6]]"] {
            assert!(
                matches!(bad.parse::<Configuration>(), Err(ConfigurationError::Syntax(_))),
                "{bad} should be a syntax error"
            );
        }
    }

    #[test]
    fn parse_rejects_invalid_fields() {
        assert_eq!(
            "[[0,0,0,0],[4,0,0,0]]".parse::<Configuration>(),
            Err(ConfigurationError::Descriptor {
                index: 1,
                source: DescriptorError::UnknownOperation(4),
            })
        );
        assert_eq!(
            "[[1,0,8,0]]".parse::<Configuration>(),
            Err(ConfigurationError::Descriptor {
                index: 0,
                source: DescriptorError::BitIndexOutOfRange { field: "param2", value: 8 },
            })
        );
    }

    #[test]
    fn evaluate_raw_validates_before_running() {
        assert_eq!(evaluate_raw(0b0001_0011, &[[1, 0, 1, 2]]), Ok(0b0001_0111));
        assert_eq!(
            evaluate_raw(0, &[[0, 0, 0, 0], [3, 0, 1, 9]]),
            Err(ConfigurationError::Descriptor {
                index: 1,
                source: DescriptorError::BitIndexOutOfRange { field: "param3", value: 9 },
            })
        );
        assert!(evaluate_raw(0, &[[7, 0, 0, 0]]).is_err());
    }

    #[test]
    fn gate_new_checks_indices() {
        assert!(Gate::new(Operation::Or, 7, 7, 7).is_ok());
        assert_eq!(
            Gate::new(Operation::Or, 8, 0, 0),
            Err(DescriptorError::BitIndexOutOfRange { field: "param1", value: 8 })
        );
    }

    #[test]
    fn serde_uses_code_arrays_and_validates() {
        let config: Configuration = "[[3,1,1,6],[0,2,4,2]]".parse().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, "[[3,1,1,6],[0,2,4,2]]");
        let back: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(serde_json::from_str::<Configuration>("[[5,1,1,6]]").is_err());
        assert!(serde_json::from_str::<Configuration>("[[0,1,1,300]]").is_err());
    }

    #[test]
    fn hash_ignores_whitespace_variants() {
        let a: Configuration = "[ [1, 3, 1, 2], [0,3,3,5] ]".parse().unwrap();
        let b: Configuration = "[[1,3,1,2],[0,3,3,5]]".parse().unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
        let c: Configuration = "[[1,3,1,2],[0,3,3,4]]".parse().unwrap();
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn operation_names() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.as_str()), Some(op));
            assert_eq!(Operation::try_from(u32::from(op.code())), Ok(op));
        }
        assert_eq!(Operation::from_name(" NOT "), Some(Operation::Negate));
        assert_eq!(Operation::from_name("nand"), None);
    }

    #[test]
    fn random_configuration_respects_operation_set() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(42);
        let allowed = [Operation::Negate, Operation::And];
        for _ in 0..200 {
            let config = random_configuration(&mut rng, 4, &allowed);
            assert_eq!(config.len(), 4);
            assert!(config.gates().iter().all(|g| allowed.contains(&g.op())));
        }
        let mut saw = std::collections::HashSet::new();
        for _ in 0..200 {
            for g in random_configuration(&mut rng, 4, &[]).gates() {
                saw.insert(g.op());
            }
        }
        assert_eq!(saw.len(), 4, "empty operation set falls back to all four");
    }

    #[test]
    fn random_configuration_is_seed_deterministic() {
        let mut a = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        let mut b = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                random_configuration(&mut a, 6, &Operation::ALL),
                random_configuration(&mut b, 6, &Operation::ALL)
            );
        }
    }

    fn any_gate() -> impl Strategy<Value = Gate> {
        (prop::sample::select(Operation::ALL.to_vec()), 0u8..8, 0u8..8, 0u8..8)
            .prop_map(|(op, p1, p2, p3)| Gate::new(op, p1, p2, p3).unwrap())
    }

    proptest! {
        #[test]
        fn prop_empty_is_identity(x in any::<u8>()) {
            prop_assert_eq!(evaluate(x, &[]), x);
        }

        #[test]
        fn prop_single_gate_law(x in any::<u8>(), g in any_gate()) {
            let out = evaluate(x, &[g]);
            let a = bit(x, g.param1());
            let b = bit(x, g.param2());
            let expected = match g.op() {
                Operation::Negate => 1 - a,
                Operation::And => a & b,
                Operation::Or => a | b,
                Operation::Xor => a ^ b,
            };
            prop_assert_eq!(bit(out, g.param3()), expected);
            let others = !(1u8 << g.param3());
            prop_assert_eq!(out & others, x & others);
        }

        #[test]
        fn prop_chaining_is_composition(x in any::<u8>(), g1 in any_gate(), g2 in any_gate()) {
            prop_assert_eq!(evaluate(x, &[g1, g2]), evaluate(evaluate(x, &[g1]), &[g2]));
        }

        #[test]
        fn prop_text_roundtrip(gates in prop::collection::vec(any_gate(), 0..8)) {
            let config = Configuration::new(gates);
            let parsed: Configuration = config.to_string().parse().unwrap();
            prop_assert_eq!(parsed, config);
        }
    }
}
