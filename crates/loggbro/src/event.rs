// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire types for the structured ingestion API.
//!
//! A batch is serialized as a JSON array of streams:
//!
//! ```json
//! [
//!   {
//!     "tags": {"@host": "server1", "@tag": "sshd"},
//!     "events": [
//!       {
//!         "timestamp": "2016-06-06T12:00:00+02:00",
//!         "attributes": {"fac": "4", "host": "server1", "msg": "...", "tag": "sshd"}
//!       }
//!     ]
//!   }
//! ]
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Grouping fingerprint of a stream. Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// `{"@host": host, "@tag": tag}`
    pub fn origin(host: &str, tag: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("@host".to_string(), host.to_string());
        tags.insert("@tag".to_string(), tag.to_string());
        TagSet(tags)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TagSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub timestamp: String,
    pub attributes: BTreeMap<String, String>,
}

impl Event {
    pub fn new(timestamp: String) -> Self {
        Event {
            timestamp,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// Events sharing one [`TagSet`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStream {
    pub tags: TagSet,
    pub events: Vec<Event>,
}

impl EventStream {
    pub fn new(tags: TagSet, first: Event) -> Self {
        EventStream {
            tags,
            events: vec![first],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_set_equality_ignores_order() {
        let a: TagSet = [("@host", "a"), ("@tag", "x")].into_iter().collect();
        let b: TagSet = [("@tag", "x"), ("@host", "a")].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a, TagSet::origin("a", "x"));
        assert_eq!(a.get("@host"), Some("a"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_tag_set_differs_on_value() {
        assert_ne!(TagSet::origin("a", "x"), TagSet::origin("a", "y"));
        assert_ne!(TagSet::origin("a", "x"), TagSet::origin("b", "x"));
    }

    #[test]
    fn test_batch_wire_shape() {
        let event = Event::new("2016-06-06T12:00:00+02:00".to_string())
            .with_attribute("host", "server1")
            .with_attribute("msg", "hello")
            .with_attribute("tag", "app")
            .with_attribute("fac", "3");
        let batch = vec![EventStream::new(TagSet::origin("server1", "app"), event)];

        let value = serde_json::to_value(&batch).unwrap();

        assert_eq!(
            value,
            json!([{
                "tags": {"@host": "server1", "@tag": "app"},
                "events": [{
                    "timestamp": "2016-06-06T12:00:00+02:00",
                    "attributes": {
                        "host": "server1",
                        "msg": "hello",
                        "tag": "app",
                        "fac": "3"
                    }
                }]
            }])
        );
    }
}
