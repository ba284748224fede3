//! Event/station graph for a single frequency band.
//!
//! Events and stations are the two vertex sets; every averaged observation
//! is an edge carrying its log amplitude. Site terms spread outward from
//! stations anchored by reference events: an event whose level is known
//! fixes every station that recorded it, and a station with a known term
//! fixes the level of every event it recorded.

use std::collections::{BTreeMap, BTreeSet};

use rolling_stats::Stats;

use crate::model::{EventId, SpectralObservation, StationId};

use super::SiteTermConfidence;

/// A resolved station term before it is attached to a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StationTerm {
    pub value: f64,
    pub confidence: SiteTermConfidence,
    /// Events that contributed to the value
    pub support: usize,
}

pub(crate) struct BandGraph {
    /// Mean amplitude of each (event, station) edge
    amplitudes: BTreeMap<(EventId, StationId), f64>,
    stations_of: BTreeMap<EventId, BTreeSet<StationId>>,
    events_of: BTreeMap<StationId, BTreeSet<EventId>>,
}

impl BandGraph {
    /// Build from already-validated observations. Repeated recordings of the
    /// same event at the same station are averaged.
    pub fn new(observations: &[SpectralObservation]) -> Self {
        let mut edges: BTreeMap<(EventId, StationId), Stats<f64>> = BTreeMap::new();
        for obs in observations {
            edges
                .entry((obs.event.clone(), obs.station.clone()))
                .or_insert_with(Stats::new)
                .update(obs.path_corrected_amplitude);
        }

        let mut amplitudes = BTreeMap::new();
        let mut stations_of: BTreeMap<EventId, BTreeSet<StationId>> = BTreeMap::new();
        let mut events_of: BTreeMap<StationId, BTreeSet<EventId>> = BTreeMap::new();
        for ((event, station), stats) in edges {
            stations_of
                .entry(event.clone())
                .or_default()
                .insert(station.clone());
            events_of
                .entry(station.clone())
                .or_default()
                .insert(event.clone());
            amplitudes.insert((event, station), stats.mean);
        }

        Self {
            amplitudes,
            stations_of,
            events_of,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &EventId> {
        self.stations_of.keys()
    }

    #[cfg(test)]
    pub fn stations_of(&self, event: &EventId) -> impl Iterator<Item = &StationId> {
        self.stations_of.get(event).into_iter().flatten()
    }

    pub fn amplitude(&self, event: &EventId, station: &StationId) -> Option<f64> {
        self.amplitudes
            .get(&(event.clone(), station.clone()))
            .copied()
    }

    /// Breadth-first propagation from anchored events.
    ///
    /// `anchors` maps each reference event to its predicted amplitude. The
    /// stations recording an anchor take the mean residual over their
    /// anchors (hop 0). Each further hop first levels every unlevelled event
    /// touching a termed station, then terms every untermed station touching
    /// a levelled event. Stations never reached are left out of the result.
    pub fn propagate(
        &self,
        anchors: &BTreeMap<EventId, f64>,
        max_hops: Option<usize>,
    ) -> BTreeMap<StationId, StationTerm> {
        let mut levels: BTreeMap<EventId, f64> = anchors
            .iter()
            .filter(|(event, _)| self.stations_of.contains_key(*event))
            .map(|(event, level)| (event.clone(), *level))
            .collect();

        let mut terms = BTreeMap::new();
        for (station, events) in &self.events_of {
            if let Some(term) = self.term_from_levels(station, events, &levels) {
                terms.insert(
                    station.clone(),
                    StationTerm {
                        confidence: SiteTermConfidence::Anchored,
                        ..term
                    },
                );
            }
        }

        let mut hop = 1;
        while max_hops.is_none_or(|max| hop <= max) {
            let new_levels: Vec<(EventId, f64)> = self
                .stations_of
                .iter()
                .filter(|(event, _)| !levels.contains_key(*event))
                .filter_map(|(event, stations)| {
                    self.level_from_terms(event, stations, &terms)
                        .map(|level| (event.clone(), level))
                })
                .collect();
            levels.extend(new_levels);

            let new_terms: Vec<(StationId, StationTerm)> = self
                .events_of
                .iter()
                .filter(|(station, _)| !terms.contains_key(*station))
                .filter_map(|(station, events)| {
                    self.term_from_levels(station, events, &levels).map(|term| {
                        (
                            station.clone(),
                            StationTerm {
                                confidence: SiteTermConfidence::Propagated { hops: hop },
                                ..term
                            },
                        )
                    })
                })
                .collect();
            if new_terms.is_empty() {
                break;
            }
            terms.extend(new_terms);
            hop += 1;
        }

        terms
    }

    /// Mean of `level - amplitude` over the levelled events of a station.
    fn term_from_levels(
        &self,
        station: &StationId,
        events: &BTreeSet<EventId>,
        levels: &BTreeMap<EventId, f64>,
    ) -> Option<StationTerm> {
        let mut stats: Stats<f64> = Stats::new();
        for event in events {
            if let (Some(level), Some(amp)) = (levels.get(event), self.amplitude(event, station)) {
                stats.update(level - amp);
            }
        }
        (stats.count > 0).then(|| StationTerm {
            value: stats.mean,
            confidence: SiteTermConfidence::Unconstrained,
            support: stats.count,
        })
    }

    /// Mean of `amplitude + term` over the termed stations of an event.
    fn level_from_terms(
        &self,
        event: &EventId,
        stations: &BTreeSet<StationId>,
        terms: &BTreeMap<StationId, StationTerm>,
    ) -> Option<f64> {
        let mut stats: Stats<f64> = Stats::new();
        for station in stations {
            if let (Some(term), Some(amp)) = (terms.get(station), self.amplitude(event, station)) {
                stats.update(amp + term.value);
            }
        }
        (stats.count > 0).then_some(stats.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrequencyBand;

    fn obs(event: &str, station: &str, amp: f64) -> SpectralObservation {
        SpectralObservation::new(FrequencyBand::new(1.0, 2.0).unwrap(), event, station, amp)
    }

    fn anchors(list: &[(&str, f64)]) -> BTreeMap<EventId, f64> {
        list.iter().map(|(e, v)| (EventId::from(*e), *v)).collect()
    }

    #[test]
    fn test_duplicate_edges_are_averaged() {
        let graph = BandGraph::new(&[obs("A", "S1", 1.0), obs("A", "S1", 3.0)]);
        assert_eq!(graph.amplitude(&"A".into(), &"S1".into()), Some(2.0));
        assert_eq!(graph.events().count(), 1);
        assert_eq!(graph.stations_of(&"A".into()).count(), 1);
    }

    #[test]
    fn test_anchored_terms_average_residuals() {
        let graph = BandGraph::new(&[obs("A", "S1", 1.0), obs("B", "S1", 3.0)]);
        let terms = graph.propagate(&anchors(&[("A", 7.0), ("B", 7.0)]), None);
        let s1 = terms[&StationId::from("S1")];
        assert_eq!(s1.value, 5.0);
        assert_eq!(s1.support, 2);
        assert_eq!(s1.confidence, SiteTermConfidence::Anchored);
    }

    #[test]
    fn test_propagation_counts_hops() {
        // A(ref) - S1 - B - S2 - C - S3
        let graph = BandGraph::new(&[
            obs("A", "S1", 1.0),
            obs("B", "S1", 2.0),
            obs("B", "S2", 2.5),
            obs("C", "S2", 4.0),
            obs("C", "S3", 3.0),
        ]);
        let terms = graph.propagate(&anchors(&[("A", 7.0)]), None);

        let s1 = terms[&StationId::from("S1")];
        assert_eq!(s1.value, 6.0);
        // level(B) = 2 + 6 = 8
        let s2 = terms[&StationId::from("S2")];
        assert_eq!(s2.value, 5.5);
        assert_eq!(s2.confidence, SiteTermConfidence::Propagated { hops: 1 });
        // level(C) = 4 + 5.5 = 9.5
        let s3 = terms[&StationId::from("S3")];
        assert_eq!(s3.value, 6.5);
        assert_eq!(s3.confidence, SiteTermConfidence::Propagated { hops: 2 });
    }

    #[test]
    fn test_hop_limit_stops_propagation() {
        let graph = BandGraph::new(&[
            obs("A", "S1", 1.0),
            obs("B", "S1", 2.0),
            obs("B", "S2", 2.5),
        ]);
        let terms = graph.propagate(&anchors(&[("A", 7.0)]), Some(0));
        assert!(terms.contains_key(&StationId::from("S1")));
        assert!(!terms.contains_key(&StationId::from("S2")));
    }

    #[test]
    fn test_unreachable_stations_are_absent() {
        let graph = BandGraph::new(&[obs("A", "S1", 1.0), obs("Z", "X", 1.0)]);
        let terms = graph.propagate(&anchors(&[("A", 7.0), ("missing", 3.0)]), None);
        assert_eq!(terms.len(), 1);
        assert!(!terms.contains_key(&StationId::from("X")));
    }
}
