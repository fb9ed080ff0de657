pub mod containers;
pub mod dashboard;
pub mod graph;
pub mod overview;

// Dashboard draws the shared frame (header, tab bar, footer, help overlay)
// and delegates the content area to one module per screen:
// - Screen 1: Overview (stat cards, memory and CPU charts)
// - Screen 2: Containers (filterable, sortable table)
// - Screen 3: Graph (hosts and their containers)

pub use dashboard::Dashboard;
