use super::FeatureCommand;

/// Undo/Redo-Stapel ausgeführter Löschbefehle.
///
/// Jeder Eintrag trägt seinen eigenen Snapshot; die History selbst kopiert
/// keinen Zustand. Beide Stapel sind auf `max_depth` Einträge begrenzt,
/// die ältesten fallen zuerst heraus.
#[derive(Debug, Default)]
pub struct EditHistory {
    undo_stack: Vec<FeatureCommand>,
    redo_stack: Vec<FeatureCommand>,
    max_depth: usize,
}

impl EditHistory {
    /// Erstellt einen neuen History-Manager mit maximaler Tiefe.
    pub fn new_with_capacity(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Nimmt einen gerade ausgeführten Befehl auf und verwirft den Redo-Stapel.
    pub fn record_command(&mut self, command: FeatureCommand) {
        push_bounded(&mut self.undo_stack, command, self.max_depth);
        self.redo_stack.clear();
    }

    /// Prüft ob Undo möglich ist.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Prüft ob Redo möglich ist.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Entnimmt den jüngsten Befehl zum Rückgängigmachen.
    pub fn pop_undo(&mut self) -> Option<FeatureCommand> {
        self.undo_stack.pop()
    }

    /// Entnimmt den jüngsten rückgängig gemachten Befehl.
    pub fn pop_redo(&mut self) -> Option<FeatureCommand> {
        self.redo_stack.pop()
    }

    /// Legt einen Befehl auf den Undo-Stapel, ohne Redo zu verwerfen.
    pub fn push_undo(&mut self, command: FeatureCommand) {
        push_bounded(&mut self.undo_stack, command, self.max_depth);
    }

    /// Legt einen Befehl auf den Redo-Stapel.
    pub fn push_redo(&mut self, command: FeatureCommand) {
        push_bounded(&mut self.redo_stack, command, self.max_depth);
    }

    /// Anzahl möglicher Undo-Schritte
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Anzahl möglicher Redo-Schritte
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Leert beide Stapel (z.B. nach einem Import).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded(stack: &mut Vec<FeatureCommand>, command: FeatureCommand, max_depth: usize) {
    if max_depth == 0 {
        return;
    }
    if stack.len() >= max_depth {
        stack.remove(0);
    }
    stack.push(command);
}
