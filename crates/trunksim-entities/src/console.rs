use trunksim_core::{ConsoleId, SiteId, TalkgroupId};

/// A dispatch console: a privileged, always-TDMA-capable unit that affiliates
/// to a fixed set of talkgroups at config time and registers on every Online
/// site in its home zone during `ZoneController::initialize_system`
/// (spec.md §3, §4.6). Consoles do not run the subscriber FSM in §4.3 — they
/// have no registration/affiliation negotiation, only a registered-sites set.
#[derive(Debug, Clone)]
pub struct Console {
    pub id: ConsoleId,
    pub affiliated_talkgroup_ids: Vec<TalkgroupId>,
    pub registered_sites: Vec<SiteId>,
}

impl Console {
    pub fn new(id: ConsoleId, affiliated_talkgroup_ids: Vec<TalkgroupId>) -> Self {
        Console {
            id,
            affiliated_talkgroup_ids,
            registered_sites: Vec::new(),
        }
    }

    pub fn is_affiliated_with(&self, talkgroup_id: TalkgroupId) -> bool {
        self.affiliated_talkgroup_ids.contains(&talkgroup_id)
    }

    pub fn register_at(&mut self, site_id: SiteId) {
        if !self.registered_sites.contains(&site_id) {
            self.registered_sites.push(site_id);
        }
    }

    pub fn deregister_from(&mut self, site_id: SiteId) {
        self.registered_sites.retain(|s| *s != site_id);
    }
}
