/// Container list filtering, sorting and summary counts

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::core::models::{ContainerRecord, ContainerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Running,
    Stopped,
}

impl StatusFilter {
    pub fn matches(&self, status: ContainerStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Running => status == ContainerStatus::Running,
            StatusFilter::Stopped => status == ContainerStatus::Stopped,
        }
    }

    /// All -> Running -> Stopped -> All
    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Running,
            StatusFilter::Running => StatusFilter::Stopped,
            StatusFilter::Stopped => StatusFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All Status",
            StatusFilter::Running => "Running",
            StatusFilter::Stopped => "Stopped",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "running" => Ok(StatusFilter::Running),
            "stopped" => Ok(StatusFilter::Stopped),
            other => Err(format!("unknown status filter `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerFilter {
    pub status: StatusFilter,
    /// None means every instance
    pub instance: Option<String>,
}

impl ContainerFilter {
    pub fn matches(&self, container: &ContainerRecord) -> bool {
        self.status.matches(container.status)
            && self
                .instance
                .as_deref()
                .map_or(true, |instance| container.instance == instance)
    }

    /// Step the instance filter through `instances`, wrapping back to all
    pub fn cycle_instance(&mut self, instances: &[String]) {
        self.instance = match &self.instance {
            None => instances.first().cloned(),
            Some(current) => instances
                .iter()
                .position(|i| i == current)
                .and_then(|pos| instances.get(pos + 1))
                .cloned(),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Image,
    Status,
    Instance,
    Uptime,
}

impl SortField {
    pub fn label(&self) -> &'static str {
        match self {
            SortField::Name => "Name",
            SortField::Image => "Image",
            SortField::Status => "Status",
            SortField::Instance => "Instance",
            SortField::Uptime => "Uptime",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "image" => Ok(SortField::Image),
            "status" => Ok(SortField::Status),
            "instance" | "host" => Ok(SortField::Instance),
            "uptime" => Ok(SortField::Uptime),
            other => Err(format!("unknown sort field `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction `{}`", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Column sort state; no field keeps backend order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn by(field: SortField, direction: SortDirection) -> Self {
        Self {
            field: Some(field),
            direction,
        }
    }

    /// Clicking the active column flips direction; a new column starts ascending
    pub fn toggle(&mut self, field: SortField) {
        if self.field == Some(field) {
            self.direction = self.direction.flipped();
        } else {
            self.field = Some(field);
            self.direction = SortDirection::Asc;
        }
    }

    fn compare(&self, a: &ContainerRecord, b: &ContainerRecord) -> Ordering {
        let Some(field) = self.field else {
            return Ordering::Equal;
        };

        let ordering = match field {
            SortField::Uptime => a.uptime.total_cmp(&b.uptime),
            SortField::Name => compare_text(&a.name, &b.name),
            SortField::Image => compare_text(&a.image, &b.image),
            SortField::Status => compare_text(a.status.as_str(), b.status.as_str()),
            SortField::Instance => compare_text(&a.instance, &b.instance),
        };

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filter then stable-sort a container list
pub fn filter_and_sort(
    containers: &[ContainerRecord],
    filter: &ContainerFilter,
    sort: &SortSpec,
) -> Vec<ContainerRecord> {
    let mut selected: Vec<ContainerRecord> = containers
        .iter()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect();
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

/// Distinct instances in first-seen order
pub fn instances(containers: &[ContainerRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for container in containers {
        if seen.insert(container.instance.as_str()) {
            out.push(container.instance.clone());
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsOverview {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    /// Distinct Prometheus targets (instances) reporting containers
    pub targets: usize,
}

impl StatsOverview {
    pub fn from_containers(containers: &[ContainerRecord]) -> Self {
        let running = containers.iter().filter(|c| c.status.is_running()).count();
        Self {
            total: containers.len(),
            running,
            stopped: containers.len() - running,
            targets: instances(containers).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str, image: &str, status: ContainerStatus, uptime: f64, instance: &str) -> ContainerRecord {
        ContainerRecord {
            id: name.to_string(),
            name: name.to_string(),
            image: image.to_string(),
            status,
            uptime,
            instance: instance.to_string(),
        }
    }

    fn fleet() -> Vec<ContainerRecord> {
        vec![
            container("web", "nginx", ContainerStatus::Running, 300.0, "h1"),
            container("db", "postgres", ContainerStatus::Stopped, 0.0, "h2"),
            container("Cache", "redis", ContainerStatus::Running, 1200.0, "h1"),
            container("api", "node", ContainerStatus::Running, 60.0, "h2"),
        ]
    }

    fn names(list: &[ContainerRecord]) -> Vec<&str> {
        list.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_no_sort_keeps_backend_order() {
        let sorted = filter_and_sort(&fleet(), &ContainerFilter::default(), &SortSpec::default());
        assert_eq!(names(&sorted), vec!["web", "db", "Cache", "api"]);
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let sort = SortSpec::by(SortField::Name, SortDirection::Asc);
        let sorted = filter_and_sort(&fleet(), &ContainerFilter::default(), &sort);
        assert_eq!(names(&sorted), vec!["api", "Cache", "db", "web"]);
    }

    #[test]
    fn test_sort_by_uptime_desc() {
        let sort = SortSpec::by(SortField::Uptime, SortDirection::Desc);
        let sorted = filter_and_sort(&fleet(), &ContainerFilter::default(), &sort);
        assert_eq!(names(&sorted), vec!["Cache", "web", "api", "db"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let sort = SortSpec::by(SortField::Instance, SortDirection::Asc);
        let sorted = filter_and_sort(&fleet(), &ContainerFilter::default(), &sort);
        assert_eq!(names(&sorted), vec!["web", "Cache", "db", "api"]);
    }

    #[test]
    fn test_filters_combine() {
        let filter = ContainerFilter {
            status: StatusFilter::Running,
            instance: Some("h2".to_string()),
        };
        let sorted = filter_and_sort(&fleet(), &filter, &SortSpec::default());
        assert_eq!(names(&sorted), vec!["api"]);
    }

    #[test]
    fn test_toggle_sort() {
        let mut sort = SortSpec::default();
        sort.toggle(SortField::Name);
        assert_eq!(sort, SortSpec::by(SortField::Name, SortDirection::Asc));
        sort.toggle(SortField::Name);
        assert_eq!(sort.direction, SortDirection::Desc);
        sort.toggle(SortField::Uptime);
        assert_eq!(sort, SortSpec::by(SortField::Uptime, SortDirection::Asc));
    }

    #[test]
    fn test_cycle_instance_wraps_to_all() {
        let hosts = instances(&fleet());
        assert_eq!(hosts, vec!["h1".to_string(), "h2".to_string()]);

        let mut filter = ContainerFilter::default();
        filter.cycle_instance(&hosts);
        assert_eq!(filter.instance.as_deref(), Some("h1"));
        filter.cycle_instance(&hosts);
        assert_eq!(filter.instance.as_deref(), Some("h2"));
        filter.cycle_instance(&hosts);
        assert_eq!(filter.instance, None);
    }

    #[test]
    fn test_stats_overview() {
        let stats = StatsOverview::from_containers(&fleet());
        assert_eq!(
            stats,
            StatsOverview {
                total: 4,
                running: 3,
                stopped: 1,
                targets: 2,
            }
        );
        assert_eq!(StatsOverview::from_containers(&[]), StatsOverview::default());
    }

    #[test]
    fn test_parse_query_values() {
        assert_eq!("running".parse::<StatusFilter>(), Ok(StatusFilter::Running));
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("host".parse::<SortField>(), Ok(SortField::Instance));
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
