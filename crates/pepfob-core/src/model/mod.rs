// ── Domain model ──
//
// Canonical types produced from router payloads and consumed by the
// orchestrator, CLI and simulator.

pub mod router;
pub mod wan;

pub use router::{ClientRecord, RouterInfo, RouterLocation};
pub use wan::{CellularLink, LedColor, SimSlot, WanKind, WanLink, WifiLink, order_by_priority};
