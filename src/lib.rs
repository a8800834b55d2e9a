//! # gate_oracle
//!
//! **Tiny 8-bit gate oracles, found by random search.**
//!
//! An oracle is a short list of gates (NEGATE, AND, OR, XOR) that rewrite
//! one bit of an 8-bit register at a time. The search samples random
//! oracles, runs each over all 256 inputs and keeps the first one whose
//! *hit count* (inputs that come out with any of bits 5–7 set) is small but
//! not degenerate.
//!
//! ## Quick Start
//!
//! ```rust
//! use gate_oracle::{hit_count, Configuration, HitRule, HIGH_BITS_MASK};
//!
//! let oracle: Configuration = "[[3,5,5,5],[3,6,6,6],[1,0,1,7]]".parse().unwrap();
//!
//! // Bits 5 and 6 are cleared, bit 7 becomes bit0 & bit1.
//! assert_eq!(oracle.evaluate(0b0110_0011), 0b1000_0011);
//! assert_eq!(hit_count(&oracle, HitRule::AnyHighBitSet, HIGH_BITS_MASK), 64);
//! ```
//!
//! ## Key Concepts
//!
//! - **Gate**: `p3 := op(bit p1, bit p2)` on the shared register
//! - **Configuration**: gates applied strictly in order
//! - **Hit count**: how many of the 256 inputs produce a hit
//! - **Acceptance band**: open interval of hit counts that ends the search

pub mod oracle_ir;
pub mod search;

pub use oracle_ir::{
    evaluate, evaluate_raw, Configuration, ConfigurationError, DescriptorError, Gate, Operation,
};
pub use search::{
    hit_count, run, search, AcceptanceBand, HitRule, SearchConfig, SearchError, SearchOutcome,
    HIGH_BITS_MASK,
};
