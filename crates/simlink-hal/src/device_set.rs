//! [`DeviceSet`] – the discovered wrappers, in registration order.

use crate::devices::Device;

/// Insertion-ordered map from identifier to wrapper.
///
/// Inserting an identifier that is already present replaces its wrapper but
/// keeps its position.
#[derive(Default)]
pub struct DeviceSet {
    entries: Vec<(String, Box<dyn Device>)>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `device` under its own [`key`][Device::key].  Returns the
    /// wrapper it replaced, if any.
    pub fn insert(&mut self, device: Box<dyn Device>) -> Option<Box<dyn Device>> {
        let key = device.key().to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, device)),
            None => {
                self.entries.push((key, device));
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Identifiers in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(identifier, topic)` pairs in registration order.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d.topic()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Device>> {
        self.entries.iter_mut().map(|(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
