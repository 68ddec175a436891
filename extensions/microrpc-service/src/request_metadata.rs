use crate::CallOptions;
use crate::constants::{META_DEADLINE_KEY, META_ONEWAY_KEY, META_ONEWAY_VALUE};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The typed view of a request's meta map.
///
/// Clients build it from [`CallOptions`]; servers parse it back out of the
/// decoded frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub deadline: Option<DateTime<Utc>>,
    pub oneway: bool,
    /// Every entry that is not one of the reserved keys.
    pub extra: BTreeMap<String, String>,
}

impl RequestMetadata {
    pub fn from_call_options(options: &CallOptions) -> Self {
        Self {
            deadline: options.deadline(),
            oneway: options.is_oneway(),
            extra: options.extra_meta().clone(),
        }
    }

    /// Parses a request's meta map.
    ///
    /// A deadline that is not a millisecond epoch integer is ignored rather
    /// than failing the request.
    pub fn from_meta(meta: &BTreeMap<String, String>) -> Self {
        let deadline = meta.get(META_DEADLINE_KEY).and_then(|raw| {
            let parsed = raw
                .parse::<i64>()
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable deadline meta value {:?}", raw);
            }
            parsed
        });

        let oneway = meta
            .get(META_ONEWAY_KEY)
            .is_some_and(|value| value == META_ONEWAY_VALUE);

        let extra = meta
            .iter()
            .filter(|(key, _)| key.as_str() != META_DEADLINE_KEY && key.as_str() != META_ONEWAY_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            deadline,
            oneway,
            extra,
        }
    }

    /// Renders the meta map carried on the wire.
    pub fn to_meta(&self) -> BTreeMap<String, String> {
        let mut meta = self.extra.clone();
        meta.remove(META_DEADLINE_KEY);
        meta.remove(META_ONEWAY_KEY);

        if let Some(deadline) = self.deadline {
            meta.insert(
                META_DEADLINE_KEY.to_owned(),
                deadline.timestamp_millis().to_string(),
            );
        }
        if self.oneway {
            meta.insert(META_ONEWAY_KEY.to_owned(), META_ONEWAY_VALUE.to_owned());
        }

        meta
    }
}
