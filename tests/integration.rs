// Integration test suite for ubl-core, organized by feature area.
// Each module shares common::test_client for DB lifecycle management.

mod common;

mod bootstrap;
mod chain_verification;
mod idempotency;
mod mcp_parity;
mod messages;
mod sse_replay;
