use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                $name(v)
            }
        }
    };
}

id_type!(WacnId);
id_type!(ZoneId);
id_type!(SiteId);
id_type!(SubsiteId);
id_type!(ChannelId);
id_type!(TalkgroupId);
id_type!(UnitId);
id_type!(ConsoleId);
id_type!(GroupId);

/// Call identifiers are minted at runtime, not configured, so they get their
/// own monotonic counter rather than coming from config (see `CallId::next`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Monotonic generator for `CallId`s and event sequence numbers.
#[derive(Debug, Default)]
pub struct Counter(u64);

impl Counter {
    pub fn new() -> Self {
        Counter(0)
    }

    pub fn next(&mut self) -> u64 {
        let v = self.0;
        self.0 += 1;
        v
    }

    pub fn next_call_id(&mut self) -> CallId {
        CallId(self.next())
    }
}
