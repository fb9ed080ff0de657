/// Host/container graph built from the container list

use serde::{Deserialize, Serialize};

use crate::core::models::{ContainerRecord, ContainerStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostNode {
    pub id: String,
    pub instance: String,
    pub containers: usize,
    pub running: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub id: String,
    pub name: String,
    pub image: String,
    pub instance: String,
    pub status: ContainerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub hosts: Vec<HostNode>,
    pub containers: Vec<ContainerNode>,
    pub edges: Vec<Edge>,
}

pub fn host_node_id(instance: &str) -> String {
    format!("host-{}", instance)
}

impl Topology {
    /// One node per host (first-seen order), one per container, and a
    /// host -> container edge for each container
    pub fn build(containers: &[ContainerRecord]) -> Self {
        let mut hosts: Vec<HostNode> = Vec::new();

        for container in containers {
            let index = match hosts.iter().position(|h| h.instance == container.instance) {
                Some(index) => index,
                None => {
                    hosts.push(HostNode {
                        id: host_node_id(&container.instance),
                        instance: container.instance.clone(),
                        containers: 0,
                        running: 0,
                    });
                    hosts.len() - 1
                }
            };

            let host = &mut hosts[index];
            host.containers += 1;
            if container.status.is_running() {
                host.running += 1;
            }
        }

        let nodes = containers
            .iter()
            .map(|c| ContainerNode {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                instance: c.instance.clone(),
                status: c.status,
            })
            .collect();

        let edges = containers
            .iter()
            .map(|c| Edge {
                from: host_node_id(&c.instance),
                to: c.id.clone(),
            })
            .collect();

        Self {
            hosts,
            containers: nodes,
            edges,
        }
    }

    /// Containers attached to a host, in list order
    pub fn children<'a>(&'a self, host: &'a HostNode) -> impl Iterator<Item = &'a ContainerNode> + 'a {
        self.containers.iter().filter(move |c| c.instance == host.instance)
    }
}
