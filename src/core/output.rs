//! Compact text rendering for CLI surfaces.

use crate::core::outbox::MutationDescriptor;

/// Collapse whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// One line per queued mutation, e.g. `#12 put groceries {"id":"1",...}`.
pub fn descriptor_line(d: &MutationDescriptor, max_chars: usize) -> String {
    format!(
        "#{} {} {} {}",
        d.sequence,
        d.kind,
        d.collection,
        compact_line(&d.payload.to_string(), max_chars)
    )
}

/// Summarize a queue as `put groceries, delete pantry (+3 more)`.
pub fn queue_preview(descriptors: &[MutationDescriptor], max_items: usize) -> String {
    if descriptors.is_empty() {
        return "empty".to_string();
    }
    let shown = descriptors
        .iter()
        .take(max_items)
        .map(|d| format!("{} {}", d.kind, d.collection))
        .collect::<Vec<_>>()
        .join(", ");
    if descriptors.len() > max_items {
        format!("{} (+{} more)", shown, descriptors.len() - max_items)
    } else {
        shown
    }
}

pub fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}
