/// Join and reshape raw query results
///
/// container_status drives the container list; image and uptime are looked
/// up by exact (container_name, instance). The per-host CPU and memory
/// vectors become timestamped samples in display units.

use std::collections::HashMap;

use crate::core::models::{ContainerRecord, ContainerStatus, MetricKind, Sample};
use crate::core::prometheus::QueryResult;
use crate::utils::{LABEL_CONTAINER_ID, LABEL_CONTAINER_NAME, LABEL_IMAGE, LABEL_INSTANCE};

type JoinKey<'a> = (&'a str, &'a str);

fn join_key(result: &QueryResult) -> JoinKey<'_> {
    (
        result.label(LABEL_CONTAINER_NAME).unwrap_or_default(),
        result.label(LABEL_INSTANCE).unwrap_or_default(),
    )
}

/// Index results by join key; the first result for a key wins
fn index_by_key(results: &[QueryResult]) -> HashMap<JoinKey<'_>, &QueryResult> {
    let mut index = HashMap::with_capacity(results.len());
    for result in results {
        index.entry(join_key(result)).or_insert(result);
    }
    index
}

pub fn join_containers(
    status: &[QueryResult],
    image: &[QueryResult],
    uptime: &[QueryResult],
) -> Vec<ContainerRecord> {
    let images = index_by_key(image);
    let uptimes = index_by_key(uptime);

    status
        .iter()
        .map(|result| {
            let key = join_key(result);
            let (name, instance) = key;

            let id = match result.label(LABEL_CONTAINER_ID) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => name.to_string(),
            };

            let image = images
                .get(&key)
                .and_then(|r| r.label(LABEL_IMAGE))
                .unwrap_or_default()
                .to_string();

            let uptime = uptimes
                .get(&key)
                .and_then(|r| r.numeric_value())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0);

            ContainerRecord {
                id,
                name: name.to_string(),
                image,
                status: ContainerStatus::from_value(result.raw_value().unwrap_or_default()),
                uptime,
                instance: instance.to_string(),
            }
        })
        .collect()
}

/// Turn one metric kind's per-host results into samples stamped `timestamp`.
/// Results without a finite numeric value are dropped.
pub fn samples_from(kind: MetricKind, results: &[QueryResult], timestamp: i64) -> Vec<Sample> {
    results
        .iter()
        .filter_map(|result| {
            let instance = result.label(LABEL_INSTANCE).unwrap_or_default();
            match result.numeric_value().filter(|v| v.is_finite()) {
                Some(raw) => Some(Sample {
                    timestamp,
                    instance: instance.to_string(),
                    value: kind.convert(raw),
                }),
                None => {
                    tracing::debug!(kind = kind.as_str(), instance, "dropping sample without numeric value");
                    None
                }
            }
        })
        .collect()
}
