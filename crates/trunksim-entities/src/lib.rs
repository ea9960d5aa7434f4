pub mod call;
pub mod call_queue;
pub mod clock;
pub mod console;
pub mod event_bus;
pub mod messages;
pub mod rf_scan;
pub mod site;
pub mod unit;
pub mod zone_controller;

pub use call::{resolve_mode, CallMode, CallStatus, RadioCall};
pub use call_queue::CallQueue;
pub use clock::{Clock, ScheduleError};
pub use console::Console;
pub use event_bus::EventBus;
pub use messages::{AffiliationStatus, CallInitiator, Event, EventKind, RegistrationStatus, TdmaSlot, VoiceChannel};
pub use rf_scan::{scan, ScanResult, SiteSnapshot, SubsiteSnapshot};
pub use site::{RequiredMode, SiteRuntime, SiteStatus};
pub use trunksim_core::ConsoleId;
pub use unit::{Unit, UnitEffect, UnitState};
pub use zone_controller::{SiteTableEntry, UnitStatusReport, ZoneController};
