use std::collections::HashSet;

use tokio::sync::mpsc;

/// Messages collected in one cycle, without duplicates, in order of first appearance.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Batch {
    messages: Vec<String>,
}

impl Batch {
    /// Takes everything currently queued in `rx` without waiting for more.
    pub(crate) fn drain(rx: &mut mpsc::Receiver<String>) -> Self {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Splits the batch into consecutive groups of at most `max` messages. A `max` of zero puts
    /// everything in a single group.
    pub(crate) fn groups(&self, max: usize) -> std::slice::Chunks<'_, String> {
        let size = if max == 0 { self.messages.len() } else { max };
        self.messages.chunks(size.max(1))
    }
}

impl FromIterator<String> for Batch {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let messages = iter
            .into_iter()
            .filter(|msg| seen.insert(msg.clone()))
            .collect();

        Batch { messages }
    }
}

/// Renders one group as the text of a single outbound call.
pub(crate) fn payload(group: &[String], separator: &str, identity: Option<&str>) -> String {
    let text = group.join(separator);
    match identity {
        Some(identity) => format!("[{}] {}", identity, text),
        None => text,
    }
}
