use serde_json::{Map, Value};

use crate::data::Dataset;

/// Datasets bound to Base Templates during one build, in registration order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DatasetRegistry {
    entries: Vec<(String, Dataset)>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dataset` under `name`. An existing entry with the same name
    /// is replaced and keeps its position.
    pub fn register(&mut self, name: impl Into<String>, dataset: Dataset) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = dataset,
            None => self.entries.push((name, dataset)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, dataset)| dataset)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{name: [records]}`, exposed to templates as `datasets`.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, dataset)| {
                let records = dataset
                    .iter()
                    .map(|r| Value::Object(r.fields().clone()))
                    .collect();
                (name.clone(), Value::Array(records))
            })
            .collect();
        Value::Object(map)
    }
}
