/// Relative urgency of a scheduled event. Lower numeric value sorts first in
/// the event queue, so `SYSTEM` events are always drained before `LOW` ones
/// scheduled for the same `VirtualTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPriority {
    System = 0,
    Emergency = 1,
    Preempt = 2,
    High = 3,
    Normal = 5,
    Default = 7,
    Low = 10,
}

impl EventPriority {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Default
    }
}
