//! Identification filter: which gathered records become identify events.

use engine_beacon_core::MetricFamily;

use crate::sink::Identify;

/// Family carrying the engine identification labels.
pub const ENGINE_INFO_FAMILY: &str = "engine_daemon_engine_info";

/// Label used as the identify id.
pub const ID_LABEL: &str = "id";

/// One event per `engine_daemon_engine_info` family holding exactly one metric.
/// Traits are all labels of that metric; a missing `id` label yields an empty id.
pub fn identify_events(families: &[MetricFamily]) -> Vec<Identify> {
    families
        .iter()
        .filter(|mf| mf.name == ENGINE_INFO_FAMILY && mf.metrics.len() == 1)
        .filter_map(|mf| mf.metrics.first())
        .map(|m| {
            let traits = m.label_map();
            let user_id = traits.get(ID_LABEL).cloned().unwrap_or_default();
            Identify { user_id, traits }
        })
        .collect()
}
