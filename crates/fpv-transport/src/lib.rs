//! Transport-layer building blocks shared by `fpv-receiver` and `fpv-sender`:
//! frame reassembly, pacing, the single-slot producer/consumer mailbox,
//! telemetry, the receiver demultiplexer, and the session state machine.

pub mod assembler;
pub mod dispatcher;
pub mod fec_bridge;
pub mod mailbox;
pub mod pacer;
pub mod session;
pub mod telemetry;

pub use assembler::{Assembler, AssemblerStats};
pub use dispatcher::{handle_datagram, DispatchEvent, DispatcherState};
pub use fec_bridge::{FecGroupDecoder, FecGroupEncoder};
pub use mailbox::SingleSlotMailbox;
pub use pacer::Pacer;
pub use session::{idr_reason_for, SessionDriver};
pub use telemetry::{Counters, Ema, Latencies, Telemetry};
