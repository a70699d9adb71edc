/// Entity identifiers (`shard.realm.num`) for accounts, tokens and topics.
pub mod id;

/// Ed25519 keys, signatures and threshold key lists.
pub mod key;

/// Hbar amounts and conversion between human token units and base units.
pub mod amount;

/// Ledger-side account state. State is modified using events,
/// which are created by handling transaction effects.
pub mod account;

/// Transaction bodies, freezing, signing, receipts and status codes.
pub mod transaction;

/// Network interface the client talks to, plus "in memory" implementation.
///
/// NOTE: the in memory ledger follows the same precheck, fee and signature
/// rules a real network applies, so scenarios can run without one.
pub mod network;

/// Stateless client. Every submission names the operator that pays for it.
pub mod client;

/// Account provisioning, token association, distribution and balance reads
/// used by acceptance scenarios.
pub mod helpers;

/// Environment driven configuration of accounts and ledger settings.
pub mod config;

/// Cucumber world holding per-scenario state.
pub mod world;

/// Step definitions. Registered with cucumber at link time.
mod steps;

/// Tracing setup and the scenario runner shared by the binary and the test harness.
pub mod runner;
