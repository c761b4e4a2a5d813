//! Verfolgt, auf welchem Way sich eine bewegte Position gerade befindet.
//!
//! Ways werden nach dem Wert eines Klassifizierungs-Tags gruppiert. Pro Gruppe
//! gibt es höchstens einen aktiven Way. Wechsel werden pro Gruppe über eine
//! eigene [`EventListenerRegistry`] entprellt gemeldet: innerhalb des
//! Debounce-Fensters zählt nur der letzte Zustand.

use super::listeners::{EventListenerRegistry, ListenerKey};
use crate::core::geo::{is_point_on_polyline, BoundingBox};
use crate::core::{FeatureStore, LatLng, DISTANCE_THRESHOLD};
use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// Gemeldeter Zustandswechsel einer Gruppe.
#[derive(Debug, Clone, PartialEq)]
pub struct WayPresenceEvent {
    /// Gruppenname (Tag-Wert)
    pub group: String,
    /// Zuletzt gemeldeter Way
    pub previous_way_id: Option<i64>,
    /// Aktueller Way; `None` bedeutet "Gruppe verlassen"
    pub way_id: Option<i64>,
    /// Position, die den Wechsel ausgelöst hat
    pub position: LatLng,
}

impl WayPresenceEvent {
    /// Way betreten (oder direkt gewechselt)
    pub fn is_enter(&self) -> bool {
        self.way_id.is_some()
    }
}

/// Unmittelbarer (nicht entprellter) Wechsel des aktiven Ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWayChange {
    /// Gruppenname
    pub group: String,
    /// Vorher aktiver Way
    pub previous: Option<i64>,
    /// Jetzt aktiver Way
    pub current: Option<i64>,
}

#[derive(Debug, Clone)]
struct TrackedWay {
    way_id: i64,
    coordinates: Vec<LatLng>,
    bounds: BoundingBox,
}

#[derive(Debug)]
struct WayGroup {
    ways: Vec<TrackedWay>,
    active_way: Option<i64>,
    reported_way: Option<i64>,
    listeners: EventListenerRegistry<WayPresenceEvent>,
}

impl WayGroup {
    fn new(debounce_window: Duration) -> Self {
        Self {
            ways: Vec::new(),
            active_way: None,
            reported_way: None,
            listeners: EventListenerRegistry::new(debounce_window),
        }
    }

    fn way_at(&self, point: LatLng, threshold: f64) -> Option<i64> {
        let on_way = |way: &TrackedWay| {
            way.bounds.expanded(threshold).contains(point)
                && is_point_on_polyline(point, &way.coordinates, threshold)
        };

        // Schneller Pfad: meist bleibt die Position auf dem aktiven Way
        if let Some(active) = self.active_way {
            if self.ways.iter().any(|w| w.way_id == active && on_way(w)) {
                return Some(active);
            }
        }
        self.ways
            .iter()
            .filter(|w| Some(w.way_id) != self.active_way)
            .find(|w| on_way(w))
            .map(|w| w.way_id)
    }
}

/// Way-Tracker über alle Gruppen.
#[derive(Debug)]
pub struct WayTracker {
    groups: IndexMap<String, WayGroup>,
    threshold: f64,
    debounce_window: Duration,
    last_position: Option<LatLng>,
}

impl WayTracker {
    /// Erstellt einen leeren Tracker.
    pub fn new(threshold: f64, debounce_window: Duration) -> Self {
        Self {
            groups: IndexMap::new(),
            threshold,
            debounce_window,
            last_position: None,
        }
    }

    /// Baut die Gruppen aus den Ways des Stores neu auf.
    ///
    /// Ways ohne `group_tag_key` werden nicht verfolgt. Listener und aktive Ways
    /// bestehender Gruppen bleiben erhalten, solange der Way noch existiert.
    /// Verschwindet ein aktiver Way, wird zum Zeitpunkt `now` ein entprelltes
    /// Verlassen an der zuletzt bekannten Position eingeplant.
    pub fn sync_from_store(&mut self, store: &FeatureStore, group_tag_key: &str, now: Instant) {
        for group in self.groups.values_mut() {
            group.ways.clear();
        }

        let mut skipped = 0usize;
        for way_id in store.way_ids() {
            let Ok(way) = store.get_way(way_id) else {
                continue;
            };
            let Some(value) = way.tags.get(group_tag_key) else {
                continue;
            };
            let Ok(coordinates) = store.way_coordinates(way_id) else {
                skipped += 1;
                continue;
            };
            let Some(bounds) = BoundingBox::from_points(&coordinates) else {
                skipped += 1;
                continue;
            };
            let debounce_window = self.debounce_window;
            self.groups
                .entry(value.as_text())
                .or_insert_with(|| WayGroup::new(debounce_window))
                .ways
                .push(TrackedWay {
                    way_id,
                    coordinates,
                    bounds,
                });
        }

        for (name, group) in self.groups.iter_mut() {
            let Some(active) = group.active_way else {
                continue;
            };
            if group.ways.iter().any(|w| w.way_id == active) {
                continue;
            }
            group.active_way = None;
            log::debug!("Aktiver Way {} der Gruppe '{}' entfernt", active, name);

            match (group.reported_way, self.last_position) {
                (Some(reported), Some(position)) => {
                    group.listeners.invoke_debounce_event_listeners_at(
                        WayPresenceEvent {
                            group: name.clone(),
                            previous_way_id: Some(reported),
                            way_id: None,
                            position,
                        },
                        now,
                    );
                }
                _ => {
                    group.listeners.cancel_debounce();
                }
            }
        }

        if skipped > 0 {
            log::warn!("{} Ways ohne auflösbare Koordinaten übersprungen", skipped);
        }
        log::debug!(
            "Way-Tracker synchronisiert: {} Gruppen, {} Ways",
            self.groups.len(),
            self.tracked_way_count()
        );
    }

    /// Registriert einen Listener für eine Gruppe (legt die Gruppe bei Bedarf an).
    pub fn add_group_listener(
        &mut self,
        group: &str,
        key: ListenerKey,
        callback: impl FnMut(&WayPresenceEvent) + 'static,
    ) -> bool {
        let debounce_window = self.debounce_window;
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| WayGroup::new(debounce_window))
            .listeners
            .add_event_listener(key, callback)
    }

    /// Entfernt einen Gruppen-Listener.
    pub fn remove_group_listener(&mut self, group: &str, key: &ListenerKey) -> bool {
        self.groups
            .get_mut(group)
            .map(|g| g.listeners.remove_event_listener(key))
            .unwrap_or(false)
    }

    /// Verarbeitet eine neue Position.
    ///
    /// Gibt die unmittelbaren Wechsel der aktiven Ways zurück; die Listener
    /// erfahren davon erst nach Ablauf des Debounce-Fensters (siehe `poll`).
    pub fn update_position(&mut self, point: LatLng, now: Instant) -> Vec<ActiveWayChange> {
        self.last_position = Some(point);
        let mut changes = Vec::new();
        for (name, group) in self.groups.iter_mut() {
            let current = group.way_at(point, self.threshold);
            if current == group.active_way {
                continue;
            }
            changes.push(ActiveWayChange {
                group: name.clone(),
                previous: group.active_way,
                current,
            });
            group.active_way = current;

            if current == group.reported_way {
                // Zurück zum gemeldeten Zustand: nichts auszuliefern
                group.listeners.cancel_debounce();
                continue;
            }
            group.listeners.invoke_debounce_event_listeners_at(
                WayPresenceEvent {
                    group: name.clone(),
                    previous_way_id: group.reported_way,
                    way_id: current,
                    position: point,
                },
                now,
            );
        }
        changes
    }

    /// Liefert fällige entprellte Meldungen aus; gibt deren Anzahl zurück.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut delivered = 0;
        for group in self.groups.values_mut() {
            let pending = group.listeners.pending_args().map(|e| e.way_id);
            if let Some(way_id) = pending {
                if group.listeners.poll(now) {
                    group.reported_way = way_id;
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Liefert alle ausstehenden Meldungen sofort aus.
    pub fn flush(&mut self) -> usize {
        let mut delivered = 0;
        for group in self.groups.values_mut() {
            let pending = group.listeners.pending_args().map(|e| e.way_id);
            if let Some(way_id) = pending {
                if group.listeners.flush() {
                    group.reported_way = way_id;
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Aktiver Way einer Gruppe.
    pub fn active_way(&self, group: &str) -> Option<i64> {
        self.groups.get(group).and_then(|g| g.active_way)
    }

    /// Gruppennamen in Einfüge-Reihenfolge.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Anzahl verfolgter Ways über alle Gruppen.
    pub fn tracked_way_count(&self) -> usize {
        self.groups.values().map(|g| g.ways.len()).sum()
    }

    /// Entfernt alle Gruppen samt Listenern.
    pub fn destroy(&mut self) {
        for group in self.groups.values_mut() {
            group.listeners.destroy();
        }
        self.groups.clear();
        self.last_position = None;
    }
}

impl Default for WayTracker {
    fn default() -> Self {
        Self::new(DISTANCE_THRESHOLD, super::listeners::DEFAULT_DEBOUNCE_WINDOW)
    }
}
