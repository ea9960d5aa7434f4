use trunksim_core::rf::{scan_one, Coverage, JitterSource, SignalReport};
use trunksim_core::{Location, SiteId, SubsiteId, ZoneId};

use crate::site::{SiteRuntime, SiteStatus};

/// A single subsite's geometry, copied out of config so a scan can run
/// against sites owned by a different `ZoneController` without borrowing it
/// (spec.md §5: scans must see every Online site in every zone, but each
/// zone otherwise owns its state exclusively).
#[derive(Debug, Clone, Copy)]
pub struct SubsiteSnapshot {
    pub id: SubsiteId,
    pub location: Location,
    pub operating_radius_km: f64,
}

/// A read-only, owned view of one site, enough to run `scan` against it.
#[derive(Debug, Clone)]
pub struct SiteSnapshot {
    pub zone_id: ZoneId,
    pub site_id: SiteId,
    pub status: SiteStatus,
    pub subsites: Vec<SubsiteSnapshot>,
}

impl SiteRuntime {
    pub fn snapshot(&self, zone_id: ZoneId) -> SiteSnapshot {
        SiteSnapshot {
            zone_id,
            site_id: self.id(),
            status: self.status,
            subsites: self
                .config
                .subsites
                .iter()
                .map(|s| SubsiteSnapshot {
                    id: s.id,
                    location: s.location,
                    operating_radius_km: s.operating_radius_km,
                })
                .collect(),
        }
    }
}

/// One scored candidate from a scan: the best subsite of an Online site, not
/// yet excluded by a unit's ban list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub zone_id: ZoneId,
    pub site_id: SiteId,
    pub subsite_id: SubsiteId,
    pub report: SignalReport,
}

fn best_subsite_of(site: &SiteSnapshot, unit_location: Location, jitter: &mut dyn JitterSource) -> Option<ScanResult> {
    let mut best: Option<ScanResult> = None;
    for sub in &site.subsites {
        let coverage = Coverage {
            location: sub.location,
            operating_radius_km: sub.operating_radius_km,
        };
        let report = scan_one(unit_location, coverage, jitter.next_jitter());
        let candidate = ScanResult {
            zone_id: site.zone_id,
            site_id: site.site_id,
            subsite_id: sub.id,
            report,
        };
        best = Some(match best {
            None => candidate,
            Some(current) => pick_better(current, candidate),
        });
    }
    best
}

/// Ties broken by lower distance, then by lower `(zone_id, site_id,
/// subsite_id)` (spec.md §4.5).
fn pick_better(a: ScanResult, b: ScanResult) -> ScanResult {
    if b.report.level != a.report.level {
        return if b.report.level > a.report.level { b } else { a };
    }
    if b.report.distance_km != a.report.distance_km {
        return if b.report.distance_km < a.report.distance_km { b } else { a };
    }
    let a_key = (a.zone_id, a.site_id, a.subsite_id);
    let b_key = (b.zone_id, b.site_id, b.subsite_id);
    if b_key < a_key {
        b
    } else {
        a
    }
}

/// Scans every `Online` site across the supplied snapshots that isn't
/// excluded by `banned`, returning the best-scoring subsite if any site has
/// non-zero signal (spec.md §4.5's `scan(unit)`).
pub fn scan<'a>(
    unit_location: Location,
    sites: impl IntoIterator<Item = &'a SiteSnapshot>,
    banned: &dyn Fn(ZoneId, SiteId) -> bool,
    jitter: &mut dyn JitterSource,
) -> Option<ScanResult> {
    let mut best: Option<ScanResult> = None;
    for site in sites {
        if site.status != SiteStatus::Online {
            continue;
        }
        if banned(site.zone_id, site.site_id) {
            continue;
        }
        if let Some(candidate) = best_subsite_of(site, unit_location, jitter) {
            if candidate.report.level == 0 {
                continue;
            }
            best = Some(match best {
                None => candidate,
                Some(current) => pick_better(current, candidate),
            });
        }
    }
    best
}

/// Like `scan`, but returns every Online, non-banned site's best subsite
/// (including zero-signal ones), strongest first. Backs
/// `ZoneController::unit_site_table` (SPEC_FULL.md §4.9): a unit's
/// most recent view of every reachable site, not just the one it would
/// register with.
pub fn scan_all<'a>(
    unit_location: Location,
    sites: impl IntoIterator<Item = &'a SiteSnapshot>,
    banned: &dyn Fn(ZoneId, SiteId) -> bool,
    jitter: &mut dyn JitterSource,
) -> Vec<ScanResult> {
    let mut results: Vec<ScanResult> = sites
        .into_iter()
        .filter(|site| site.status == SiteStatus::Online && !banned(site.zone_id, site.site_id))
        .filter_map(|site| best_subsite_of(site, unit_location, jitter))
        .collect();
    results.sort_by(|a, b| {
        if pick_better(*a, *b) == *a {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });
    results
}
