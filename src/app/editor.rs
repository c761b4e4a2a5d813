//! Fassade über Store, Segmente, Tags, History, Listener und Way-Tracker.
//!
//! Jede öffentliche Mutation läuft vollständig durch, sammelt ihre Events und
//! verteilt sie erst am Ende. Listener, die selbst ändern wollen, legen einen
//! [`GraphRequest`] in die [`RequestQueue`]; ausgeführt wird er erst bei
//! [`GraphEditor::process_deferred_requests`].

use super::command::{CommandEffect, FeatureCommand};
use super::events::{GraphEvent, GraphRequest, RequestQueue, TagTarget};
use super::history::EditHistory;
use super::listeners::{EventListenerRegistry, ListenerKey, ListenerKeyGenerator, ListenerTopic};
use super::render_scene;
use super::way_tracker::{ActiveWayChange, WayPresenceEvent, WayTracker};
use crate::core::{
    FeatureKind, FeatureStore, GraphError, GraphResult, LatLng, LineSegmentKey,
    LineSegmentManager, LineSegmentStyle, NodeOptions, SegmentSync, SpatialMatch, TagMap,
    TagSchema, TagValue,
};
use crate::geojson::{self, ImportReport};
use crate::shared::{is_valid_color, EditorOptions, RenderScene};
use anyhow::Context;
use std::path::Path;
use std::time::Instant;

/// Obergrenze zurückgestellter Wünsche pro Aufruf von `process_deferred_requests`.
const MAX_DEFERRED_REQUESTS: usize = 1024;

/// Einstiegspunkt für alle Graph-Mutationen.
pub struct GraphEditor {
    store: FeatureStore,
    segments: LineSegmentManager,
    schema: TagSchema,
    options: EditorOptions,
    history: EditHistory,
    listeners: EventListenerRegistry<GraphEvent>,
    listener_keys: ListenerKeyGenerator,
    tracker: WayTracker,
    tracker_dirty: bool,
    requests: RequestQueue,
    pending_events: Vec<GraphEvent>,
    focus: Option<LatLng>,
}

impl GraphEditor {
    /// Erstellt einen leeren Editor.
    pub fn new(options: EditorOptions, mut schema: TagSchema) -> Self {
        if schema.primary_keys.is_empty() {
            schema.primary_keys = options.primary_tag_keys.clone();
        }
        Self {
            store: FeatureStore::new(),
            segments: LineSegmentManager::new(options.segment_style()),
            schema,
            history: EditHistory::new_with_capacity(options.history_max_depth),
            listeners: EventListenerRegistry::new(options.debounce_window()),
            listener_keys: ListenerKeyGenerator::new(),
            tracker: WayTracker::new(options.distance_threshold, options.debounce_window()),
            tracker_dirty: true,
            requests: RequestQueue::new(),
            pending_events: Vec::new(),
            focus: None,
            options,
        }
    }

    // ── Zugriff ─────────────────────────────────────────────────────

    /// Store (read-only)
    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    /// Segment-Manager (read-only)
    pub fn segments(&self) -> &LineSegmentManager {
        &self.segments
    }

    /// Tag-Schema
    pub fn schema(&self) -> &TagSchema {
        &self.schema
    }

    /// Laufzeit-Optionen
    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Letzter Kamera-Mittelpunkt aus Löschen/Undo/Redo
    pub fn focus(&self) -> Option<LatLng> {
        self.focus
    }

    /// Prüft ob Undo möglich ist.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Prüft ob Redo möglich ist.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Handle auf die Warteschlange für zurückgestellte Änderungen.
    pub fn request_queue(&self) -> RequestQueue {
        self.requests.clone()
    }

    /// Way-Tracker (read-only)
    pub fn tracker(&self) -> &WayTracker {
        &self.tracker
    }

    /// Baut die Render-Payloads des aktuellen Zustands.
    pub fn render_scene(&self) -> RenderScene {
        render_scene::build(&self.store, &self.segments, self.focus)
    }

    // ── Listener ────────────────────────────────────────────────────

    /// Registriert einen Listener für ein Thema, optional auf eine Entity gefiltert.
    pub fn add_listener(
        &mut self,
        topic: ListenerTopic,
        entity_id: Option<i64>,
        mut callback: impl FnMut(&GraphEvent) + 'static,
    ) -> ListenerKey {
        let key = self.listener_keys.next_key(entity_id, topic);
        self.listeners.add_event_listener(key, move |event: &GraphEvent| {
            let topic_matches = match topic {
                ListenerTopic::Graph => !event.is_history(),
                ListenerTopic::History => event.is_history(),
                ListenerTopic::WayPresence => false,
            };
            if topic_matches && (entity_id.is_none() || event.entity_id() == entity_id) {
                callback(event);
            }
        });
        key
    }

    /// Entfernt einen Listener.
    pub fn remove_listener(&mut self, key: &ListenerKey) -> bool {
        self.listeners.remove_event_listener(key)
    }

    /// Registriert einen Listener für Enter/Exit-Meldungen einer Way-Gruppe.
    pub fn add_way_presence_listener(
        &mut self,
        group: &str,
        callback: impl FnMut(&WayPresenceEvent) + 'static,
    ) -> ListenerKey {
        let key = self
            .listener_keys
            .next_key(None, ListenerTopic::WayPresence);
        self.tracker.add_group_listener(group, key, callback);
        key
    }

    /// Entfernt einen Way-Gruppen-Listener.
    pub fn remove_way_presence_listener(&mut self, group: &str, key: &ListenerKey) -> bool {
        self.tracker.remove_group_listener(group, key)
    }

    fn emit(&mut self, event: GraphEvent) {
        self.pending_events.push(event);
    }

    fn emit_effect(&mut self, effect: &CommandEffect) {
        let events = effect
            .segments_removed
            .iter()
            .map(|k| GraphEvent::SegmentRemoved(*k))
            .chain(effect.ways_removed.iter().map(|id| GraphEvent::WayRemoved(*id)))
            .chain(effect.nodes_removed.iter().map(|id| GraphEvent::NodeRemoved(*id)))
            .chain(effect.nodes_created.iter().map(|id| GraphEvent::NodeCreated(*id)))
            .chain(effect.ways_created.iter().map(|id| GraphEvent::WayCreated(*id)))
            .chain(
                effect
                    .segments_created
                    .iter()
                    .map(|k| GraphEvent::SegmentCreated(*k)),
            );
        self.pending_events.extend(events);
    }

    fn emit_history(&mut self) {
        let event = GraphEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        self.emit(event);
    }

    fn flush_events(&mut self) {
        let events = std::mem::take(&mut self.pending_events);
        for event in &events {
            self.listeners.invoke_event_listeners(event);
        }
    }

    // ── Nodes & Ways ────────────────────────────────────────────────

    /// Legt einen Node an; ohne ID wird die nächste freie vergeben.
    pub fn create_node(
        &mut self,
        id: Option<i64>,
        position: LatLng,
        options: Option<NodeOptions>,
        tags: Option<TagMap>,
    ) -> GraphResult<i64> {
        let position = LatLng::try_new(position.lat, position.lng)?;
        let tags = tags
            .map(|t| self.schema.merge_tags(&TagMap::new(), &t))
            .transpose()?;
        let id = id.unwrap_or_else(|| self.store.next_node_id());
        self.store.create_node(id, position, options, tags)?;
        log::debug!("Node {} angelegt", id);
        self.emit(GraphEvent::NodeCreated(id));
        self.flush_events();
        Ok(id)
    }

    /// Legt einen Way samt Segmenten an; ohne ID wird die nächste freie vergeben.
    pub fn create_way(
        &mut self,
        id: Option<i64>,
        node_ids: &[i64],
        tags: Option<TagMap>,
        visible: Option<bool>,
    ) -> GraphResult<i64> {
        let tags = tags
            .map(|t| self.schema.merge_tags(&TagMap::new(), &t))
            .transpose()?;
        let id = id.unwrap_or_else(|| self.store.next_way_id());
        self.store.create_way(id, node_ids, tags, visible)?;
        let way = self.store.get_way(id)?;
        let sync = self.segments.sync_way(way, &self.store)?;

        log::debug!("Way {} mit {} Segmenten angelegt", id, sync.created.len());
        self.tracker_dirty = true;
        self.emit(GraphEvent::WayCreated(id));
        self.emit_sync(&sync);
        self.flush_events();
        Ok(id)
    }

    fn emit_sync(&mut self, sync: &SegmentSync) {
        for segment in &sync.removed {
            self.emit(GraphEvent::SegmentRemoved(segment.key()));
        }
        for key in &sync.created {
            self.emit(GraphEvent::SegmentCreated(*key));
        }
    }

    /// Ersetzt die Node-Liste eines Ways und gleicht seine Segmente ab.
    pub fn set_way_nodes(&mut self, way_id: i64, node_ids: &[i64]) -> GraphResult<SegmentSync> {
        self.store.set_way_nodes(way_id, node_ids)?;
        let way = self.store.get_way(way_id)?;
        let sync = self.segments.sync_way(way, &self.store)?;

        log::info!(
            "Way {} geändert: {} Segmente neu, {} verworfen",
            way_id,
            sync.created.len(),
            sync.removed.len()
        );
        self.tracker_dirty = true;
        self.emit(GraphEvent::WayNodesChanged(way_id));
        self.emit_sync(&sync);
        self.flush_events();
        Ok(sync)
    }

    /// Verschiebt einen Node und zieht die Pfade aller berührenden Segmente nach.
    pub fn move_node(&mut self, node_id: i64, position: LatLng) -> GraphResult<()> {
        let position = LatLng::try_new(position.lat, position.lng)?;
        self.store.update_node_position(node_id, position)?;
        let node = self.store.get_node(node_id)?;
        let updated = self.segments.update_paths_of_node(node);

        log::debug!("Node {} verschoben, {} Segmente nachgeführt", node_id, updated.len());
        self.tracker_dirty = true;
        self.emit(GraphEvent::NodeMoved { node_id, position });
        self.flush_events();
        Ok(())
    }

    /// Setzt die Sichtbarkeit eines Nodes.
    pub fn set_node_visible(&mut self, node_id: i64, visible: bool) -> GraphResult<()> {
        let node = self.store.get_node_mut(node_id)?;
        if node.visible == visible {
            return Ok(());
        }
        node.visible = visible;
        self.emit(GraphEvent::VisibilityChanged {
            kind: FeatureKind::Node,
            id: node_id,
            visible,
        });
        self.flush_events();
        Ok(())
    }

    /// Setzt die Sichtbarkeit eines Ways und aller seiner Segmente.
    pub fn set_way_visible(&mut self, way_id: i64, visible: bool) -> GraphResult<()> {
        let way = self.store.get_way_mut(way_id)?;
        if way.visible == visible {
            return Ok(());
        }
        way.visible = visible;
        self.segments.set_way_visible(way_id, visible);
        self.emit(GraphEvent::VisibilityChanged {
            kind: FeatureKind::Way,
            id: way_id,
            visible,
        });
        self.flush_events();
        Ok(())
    }

    /// Ersetzt den Style eines Segments (Farbe wird geprüft).
    pub fn set_segment_style(
        &mut self,
        key: &LineSegmentKey,
        style: LineSegmentStyle,
    ) -> GraphResult<()> {
        if !is_valid_color(&style.stroke_color) {
            return Err(GraphError::InvalidValue {
                field: "stroke_color".to_string(),
                reason: format!("'{}' ist keine Farbe", style.stroke_color),
            });
        }
        self.segments.get_line_segment_mut(key)?.style = style;
        Ok(())
    }

    // ── Spatial ─────────────────────────────────────────────────────

    /// Nächstgelegener Node zur Position.
    pub fn nearest_node(&mut self, query: LatLng) -> Option<SpatialMatch> {
        self.store.ensure_spatial_index();
        self.store.nearest_node(query)
    }

    /// Alle Nodes innerhalb eines Radius (Grad).
    pub fn nodes_within_radius(&mut self, query: LatLng, radius: f64) -> Vec<SpatialMatch> {
        self.store.ensure_spatial_index();
        self.store.nodes_within_radius(query, radius)
    }

    // ── Tags ────────────────────────────────────────────────────────

    /// Tags eines Features.
    pub fn tags_of(&self, target: TagTarget) -> GraphResult<&TagMap> {
        match target {
            TagTarget::Node(id) => Ok(&self.store.get_node(id)?.tags),
            TagTarget::Way(id) => Ok(&self.store.get_way(id)?.tags),
        }
    }

    fn replace_tags(&mut self, target: TagTarget, tags: TagMap) -> GraphResult<()> {
        match target {
            TagTarget::Node(id) => self.store.get_node_mut(id)?.tags = tags,
            TagTarget::Way(id) => {
                self.store.get_way_mut(id)?.tags = tags;
                self.tracker_dirty = true;
            }
        }
        let (kind, id) = target.kind_and_id();
        self.emit(GraphEvent::TagsChanged { kind, id });
        self.flush_events();
        Ok(())
    }

    /// Fügt einen Wert hinzu (CSV: anhängen, skalar: überschreiben).
    pub fn add_tag(&mut self, target: TagTarget, key: &str, value: TagValue) -> GraphResult<()> {
        let updated = self.schema.add_tags(self.tags_of(target)?, key, value)?;
        self.replace_tags(target, updated)
    }

    /// Bereinigt eine Benutzereingabe und fügt sie als Wert hinzu.
    pub fn add_tag_input(&mut self, target: TagTarget, key: &str, raw: &str) -> GraphResult<()> {
        let value = self.schema.refine_value(key, raw)?;
        self.add_tag(target, key, TagValue::Text(value))
    }

    /// Vereinigt Tags mit einem Feature; Konflikte werden nie überschrieben.
    pub fn merge_tags(&mut self, target: TagTarget, partial: &TagMap) -> GraphResult<()> {
        let merged = self.schema.merge_tags(self.tags_of(target)?, partial)?;
        if &merged == self.tags_of(target)? {
            log::debug!("Tags unverändert: {:?}", target);
            return Ok(());
        }
        self.replace_tags(target, merged)
    }

    /// Trockenlauf von [`merge_tags`](Self::merge_tags).
    pub fn is_tags_mergeable(&self, target: TagTarget, partial: &TagMap) -> GraphResult<bool> {
        Ok(self.schema.is_tags_mergeable(self.tags_of(target)?, partial))
    }

    /// Entfernt einzelne Werte eines Schlüssels.
    pub fn delete_tag_values(
        &mut self,
        target: TagTarget,
        key: &str,
        values: &[String],
    ) -> GraphResult<()> {
        let updated = self
            .schema
            .delete_tags_values(self.tags_of(target)?, key, values);
        self.replace_tags(target, updated)
    }

    // ── Löschen & History ───────────────────────────────────────────

    /// Löscht Nodes und Segmente als rückgängig machbaren Befehl.
    pub fn delete_features(
        &mut self,
        node_ids: &[i64],
        segment_keys: &[LineSegmentKey],
    ) -> GraphResult<CommandEffect> {
        if node_ids.is_empty() && segment_keys.is_empty() {
            log::debug!("Löschen ohne Ziele ignoriert");
            return Ok(CommandEffect::default());
        }
        let mut command = FeatureCommand::new(node_ids, segment_keys);
        let effect = command.do_command(&mut self.store, &mut self.segments)?;
        self.focus = command.center().or(self.focus);
        self.history.record_command(command);

        self.tracker_dirty = true;
        self.emit_effect(&effect);
        self.emit_history();
        self.flush_events();
        Ok(effect)
    }

    /// Macht den letzten Löschbefehl rückgängig. `false`, wenn nichts anliegt.
    pub fn undo(&mut self) -> GraphResult<bool> {
        let Some(command) = self.history.pop_undo() else {
            log::debug!("Undo: nichts rückgängig zu machen");
            return Ok(false);
        };
        let effect = match command.undo(&mut self.store, &mut self.segments) {
            Ok(effect) => effect,
            Err(e) => {
                self.history.push_undo(command);
                return Err(e);
            }
        };
        self.focus = command.center().or(self.focus);
        self.history.push_redo(command);

        log::info!("Undo ausgeführt");
        self.tracker_dirty = true;
        self.emit_effect(&effect);
        self.emit_history();
        self.flush_events();
        Ok(true)
    }

    /// Wiederholt den zuletzt rückgängig gemachten Befehl gegen den aktuellen Zustand.
    ///
    /// Scheitert die Wiederholung, bleibt der Befehl auf dem Redo-Stapel.
    pub fn redo(&mut self) -> GraphResult<bool> {
        let Some(mut command) = self.history.pop_redo() else {
            log::debug!("Redo: nichts zu wiederholen");
            return Ok(false);
        };
        let effect = match command.do_command(&mut self.store, &mut self.segments) {
            Ok(effect) => effect,
            Err(e) => {
                log::warn!("Redo fehlgeschlagen: {}", e);
                self.history.push_redo(command);
                return Err(e);
            }
        };
        self.focus = command.center().or(self.focus);
        self.history.push_undo(command);

        log::info!("Redo ausgeführt");
        self.tracker_dirty = true;
        self.emit_effect(&effect);
        self.emit_history();
        self.flush_events();
        Ok(true)
    }

    // ── Zurückgestellte Änderungen ──────────────────────────────────

    /// Führt alle wartenden Änderungswünsche aus.
    ///
    /// Auch Wünsche, die währenddessen von Listenern nachgelegt werden, laufen
    /// in dieser Runde. Gibt den ersten Fehler zurück, führt aber alle aus.
    pub fn process_deferred_requests(&mut self) -> GraphResult<usize> {
        let mut processed = 0;
        let mut first_error = None;
        while let Some(request) = self.requests.pop() {
            if processed >= MAX_DEFERRED_REQUESTS {
                log::warn!(
                    "Mehr als {} zurückgestellte Änderungen, Rest verworfen",
                    MAX_DEFERRED_REQUESTS
                );
                self.requests.clear();
                break;
            }
            processed += 1;
            if let Err(e) = self.execute_request(request) {
                log::warn!("Zurückgestellte Änderung fehlgeschlagen: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }

    fn execute_request(&mut self, request: GraphRequest) -> GraphResult<()> {
        match request {
            GraphRequest::DeleteFeatures {
                node_ids,
                segment_keys,
            } => self.delete_features(&node_ids, &segment_keys).map(|_| ()),
            GraphRequest::MoveNode { node_id, position } => self.move_node(node_id, position),
            GraphRequest::SetNodeVisible { node_id, visible } => {
                self.set_node_visible(node_id, visible)
            }
            GraphRequest::SetWayVisible { way_id, visible } => {
                self.set_way_visible(way_id, visible)
            }
            GraphRequest::AddTag { target, key, value } => self.add_tag(target, &key, value),
            GraphRequest::MergeTags { target, tags } => self.merge_tags(target, &tags),
            GraphRequest::Undo => self.undo().map(|_| ()),
            GraphRequest::Redo => self.redo().map(|_| ()),
        }
    }

    // ── Way-Tracker ─────────────────────────────────────────────────

    fn ensure_tracker(&mut self, now: Instant) {
        if self.tracker_dirty {
            self.tracker
                .sync_from_store(&self.store, &self.options.tracker_group_tag_key, now);
            self.tracker_dirty = false;
        }
    }

    /// Verarbeitet eine Live-Position.
    pub fn update_position(&mut self, point: LatLng, now: Instant) -> Vec<ActiveWayChange> {
        self.ensure_tracker(now);
        self.tracker.update_position(point, now)
    }

    /// Liefert fällige entprellte Way-Meldungen aus.
    pub fn poll(&mut self, now: Instant) -> usize {
        self.ensure_tracker(now);
        self.tracker.poll(now)
    }

    /// Liefert alle ausstehenden Way-Meldungen sofort aus.
    pub fn flush_way_presence(&mut self) -> usize {
        self.ensure_tracker(Instant::now());
        self.tracker.flush()
    }

    // ── Import / Export ─────────────────────────────────────────────

    /// Ersetzt den gesamten Graphen (z.B. nach einem Import).
    ///
    /// Segmente werden neu abgeleitet, die History wird geleert.
    pub fn load_store(&mut self, store: FeatureStore) -> GraphResult<()> {
        let mut segments = LineSegmentManager::new(self.options.segment_style());
        for way_id in store.way_ids() {
            segments.sync_way(store.get_way(way_id)?, &store)?;
        }
        let removed_ways = self.store.way_ids();
        let removed_nodes = self.store.node_ids();

        self.store = store;
        self.segments = segments;
        self.history.clear();
        self.focus = None;
        self.tracker_dirty = true;

        for id in removed_ways {
            self.emit(GraphEvent::WayRemoved(id));
        }
        for id in removed_nodes {
            self.emit(GraphEvent::NodeRemoved(id));
        }
        for id in self.store.node_ids() {
            self.emit(GraphEvent::NodeCreated(id));
        }
        for id in self.store.way_ids() {
            self.emit(GraphEvent::WayCreated(id));
        }
        self.emit_history();
        self.flush_events();
        Ok(())
    }

    /// Importiert eine GeoJSON-FeatureCollection und ersetzt den Graphen.
    pub fn import_geojson(&mut self, text: &str) -> anyhow::Result<ImportReport> {
        let (store, report) = geojson::parse_geojson(text, &self.schema)?;
        self.load_store(store)?;
        log::info!(
            "GeoJSON importiert: {} Nodes, {} Ways ({} übersprungen)",
            report.nodes,
            report.ways,
            report.skipped_ways.len()
        );
        Ok(report)
    }

    /// Exportiert den Graphen als GeoJSON-Text.
    pub fn export_geojson(&self) -> anyhow::Result<String> {
        geojson::write_geojson(&self.store)
    }

    /// Lädt eine GeoJSON-Datei.
    pub fn load_geojson_file(&mut self, path: &Path) -> anyhow::Result<ImportReport> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("GeoJSON-Datei nicht lesbar: {}", path.display()))?;
        self.import_geojson(&text)
    }

    /// Speichert den Graphen als GeoJSON-Datei.
    pub fn save_geojson_file(&self, path: &Path) -> anyhow::Result<()> {
        let text = self.export_geojson()?;
        std::fs::write(path, text)
            .with_context(|| format!("GeoJSON-Datei nicht schreibbar: {}", path.display()))?;
        log::info!("GeoJSON gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Entfernt alle Listener und verwirft wartende Wünsche.
    pub fn destroy(&mut self) {
        self.listeners.destroy();
        self.tracker.destroy();
        self.requests.clear();
        self.pending_events.clear();
    }
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default(), TagSchema::default())
    }
}
