pub mod debug;
pub mod geo;
pub mod ids;
pub mod priority;
pub mod rf;
pub mod time;

pub use geo::{distance_km, Location, OperationalArea};
pub use ids::{CallId, ChannelId, Counter, GroupId, SiteId, SubsiteId, TalkgroupId, UnitId, ConsoleId, WacnId, ZoneId};
pub use priority::EventPriority;
pub use time::VirtualTime;
