//! Registry für Event-Listener mit optionalem Debounce.
//!
//! Single-threaded: Debounce-Timer sind Deadlines, die der Host-Loop per
//! [`EventListenerRegistry::poll`] abfragt. Ein neuer Debounce-Aufruf ersetzt
//! einen noch ausstehenden; ausgeliefert wird nur der letzte.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Standard-Debounce-Fenster.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Thema eines Listeners (Teil des zusammengesetzten Schlüssels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTopic {
    /// Änderungen an Nodes, Ways und Segmenten
    Graph,
    /// Undo/Redo-Verfügbarkeit
    History,
    /// Betreten/Verlassen eines Ways (Way-Tracker)
    WayPresence,
}

/// Strukturierter Listener-Schlüssel: Entity + Thema + laufende Nummer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    /// Betroffenes Feature (optional)
    pub entity_id: Option<i64>,
    /// Thema
    pub topic: ListenerTopic,
    /// Monotone laufende Nummer
    pub seq: u64,
}

/// Erzeugt eindeutige Listener-Schlüssel über einen monotonen Zähler.
#[derive(Debug, Default)]
pub struct ListenerKeyGenerator {
    next_seq: u64,
}

impl ListenerKeyGenerator {
    /// Erstellt einen neuen Generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Liefert den nächsten Schlüssel.
    pub fn next_key(&mut self, entity_id: Option<i64>, topic: ListenerTopic) -> ListenerKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        ListenerKey {
            entity_id,
            topic,
            seq,
        }
    }
}

/// Callback-Typ eines Listeners.
pub type Listener<A> = Box<dyn FnMut(&A)>;

struct PendingInvocation<A> {
    due: Instant,
    args: A,
}

/// Registry: Schlüssel → Callback, mit Fan-out und Debounce-Variante.
pub struct EventListenerRegistry<A> {
    listeners: HashMap<ListenerKey, Listener<A>>,
    debounce_window: Duration,
    pending: Option<PendingInvocation<A>>,
}

impl<A> EventListenerRegistry<A> {
    /// Erstellt eine leere Registry mit dem angegebenen Debounce-Fenster.
    pub fn new(debounce_window: Duration) -> Self {
        Self {
            listeners: HashMap::new(),
            debounce_window,
            pending: None,
        }
    }

    /// Registriert einen Listener. `false`, wenn der Schlüssel bereits belegt ist.
    pub fn add_event_listener(
        &mut self,
        key: ListenerKey,
        callback: impl FnMut(&A) + 'static,
    ) -> bool {
        if self.listeners.contains_key(&key) {
            log::debug!("Listener {:?} bereits registriert", key);
            return false;
        }
        self.listeners.insert(key, Box::new(callback));
        true
    }

    /// Entfernt einen Listener (gibt zurück ob er existierte).
    pub fn remove_event_listener(&mut self, key: &ListenerKey) -> bool {
        self.listeners.remove(key).is_some()
    }

    /// Ruft alle Listener sofort auf (Reihenfolge unbestimmt).
    pub fn invoke_event_listeners(&mut self, args: &A) -> usize {
        for callback in self.listeners.values_mut() {
            callback(args);
        }
        self.listeners.len()
    }

    /// Plant einen verzögerten Aufruf; ein ausstehender wird verworfen.
    pub fn invoke_debounce_event_listeners(&mut self, args: A) {
        self.invoke_debounce_event_listeners_at(args, Instant::now());
    }

    /// Wie [`invoke_debounce_event_listeners`](Self::invoke_debounce_event_listeners)
    /// mit explizitem Zeitpunkt.
    pub fn invoke_debounce_event_listeners_at(&mut self, args: A, now: Instant) {
        self.pending = Some(PendingInvocation {
            due: now + self.debounce_window,
            args,
        });
    }

    /// Liefert den ausstehenden Aufruf aus, sobald sein Fenster abgelaufen ist.
    pub fn poll(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if pending.due <= now => self.flush(),
            _ => false,
        }
    }

    /// Liefert einen ausstehenden Aufruf sofort aus.
    pub fn flush(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.invoke_event_listeners(&pending.args);
        true
    }

    /// Verwirft einen ausstehenden Aufruf ohne ihn auszuliefern.
    pub fn cancel_debounce(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Prüft ob ein Debounce-Aufruf aussteht.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Argumente des ausstehenden Aufrufs.
    pub fn pending_args(&self) -> Option<&A> {
        self.pending.as_ref().map(|p| &p.args)
    }

    /// Gibt die Anzahl registrierter Listener zurück.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Gibt `true` zurück, wenn keine Listener registriert sind.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Entfernt alle Listener und verwirft ausstehende Aufrufe.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        self.pending = None;
    }
}

impl<A> Default for EventListenerRegistry<A> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

impl<A> std::fmt::Debug for EventListenerRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListenerRegistry")
            .field("listeners", &self.listeners.len())
            .field("debounce_window", &self.debounce_window)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
