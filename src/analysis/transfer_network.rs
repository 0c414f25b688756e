//! Transfer graph construction and topology analysis
//!
//! Aggregates decoded transfers into a directed weighted graph: one
//! node per address, one edge per `(from, to)` pair carrying the
//! summed volume and transfer count. Oversized graphs truncate to the
//! highest-volume nodes. Topology analysis flags hubs, authorities,
//! and isolated nodes, clusters the graph greedily around top hubs,
//! and ranks critical paths by volume.
//!
//! The output is plain node/edge data plus a textual diagram source;
//! rendering belongs to the presentation layer.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::types::TokenTransfer;

/// Default node cap before volume-ranked truncation
pub const DEFAULT_MAX_NODES: usize = 50;

/// Minimum degree before a node can be a hub or authority
const ROLE_MIN_DEGREE: usize = 2;

/// Structural role of a node in the transfer graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// High out-degree and outbound volume
    Hub,
    /// High in-degree and inbound volume
    Authority,
    /// No edges after truncation
    Isolated,
    /// Everything else
    Regular,
}

/// One address in the transfer graph
#[derive(Debug, Clone, Serialize)]
pub struct NetworkNode {
    /// Node address
    pub address: Address,
    /// Sum of inbound transfer volume
    pub in_volume: U256,
    /// Sum of outbound transfer volume
    pub out_volume: U256,
    /// Distinct senders into this node
    pub in_degree: usize,
    /// Distinct recipients out of this node
    pub out_degree: usize,
    /// Structural role
    pub role: NodeRole,
}

/// One aggregated `(from, to)` edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEdge {
    /// Sender address
    pub from: Address,
    /// Recipient address
    pub to: Address,
    /// Summed transfer volume
    pub volume: U256,
    /// Number of raw transfers collapsed into this edge
    pub count: u64,
}

/// Topology metrics over a built network
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    /// Hub node addresses
    pub hubs: Vec<Address>,
    /// Authority node addresses
    pub authorities: Vec<Address>,
    /// Nodes with no edges
    pub isolated: Vec<Address>,
    /// Greedy clusters seeded from the top hubs, largest volume first
    pub clusters: Vec<Vec<Address>>,
    /// Edges above the mean edge volume, descending
    pub critical_paths: Vec<NetworkEdge>,
    /// Mean volume across all edges
    pub mean_edge_volume: U256,
}

/// Aggregated directed weighted transfer graph
#[derive(Debug, Clone, Serialize)]
pub struct TransferNetwork {
    /// Nodes, highest combined volume first
    pub nodes: Vec<NetworkNode>,
    /// Aggregated edges; no duplicate `(from, to)` keys
    pub edges: Vec<NetworkEdge>,
    /// Whether the node cap forced truncation
    pub truncated: bool,
    /// Layout-agnostic diagram source for presentation layers
    pub diagram: String,
}

impl TransferNetwork {
    /// Look up a node by address
    pub fn node(&self, address: &Address) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.address == *address)
    }

    /// Compute topology metrics over this network
    pub fn topology(&self) -> TopologyReport {
        let hubs: Vec<Address> = self
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Hub)
            .map(|n| n.address)
            .collect();
        let authorities = self
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Authority)
            .map(|n| n.address)
            .collect();
        let isolated = self
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Isolated)
            .map(|n| n.address)
            .collect();

        let mean_edge_volume = if self.edges.is_empty() {
            U256::ZERO
        } else {
            self.edges
                .iter()
                .fold(U256::ZERO, |acc, e| acc + e.volume)
                / U256::from(self.edges.len())
        };

        let mut critical_paths: Vec<NetworkEdge> = self
            .edges
            .iter()
            .filter(|e| e.volume > mean_edge_volume)
            .cloned()
            .collect();
        critical_paths.sort_by(|a, b| b.volume.cmp(&a.volume));

        TopologyReport {
            clusters: self.clusters(&hubs),
            hubs,
            authorities,
            isolated,
            critical_paths,
            mean_edge_volume,
        }
    }

    /// Greedy single-pass clustering: each top hub claims its
    /// unassigned direct neighbors
    fn clusters(&self, hubs: &[Address]) -> Vec<Vec<Address>> {
        let mut seeds: Vec<&NetworkNode> = hubs
            .iter()
            .filter_map(|addr| self.node(addr))
            .collect();
        seeds.sort_by(|a, b| (b.out_volume + b.in_volume).cmp(&(a.out_volume + a.in_volume)));

        let mut assigned: HashSet<Address> = HashSet::new();
        let mut clusters = Vec::new();

        for seed in seeds {
            if assigned.contains(&seed.address) {
                continue;
            }
            assigned.insert(seed.address);
            let mut cluster = vec![seed.address];
            for edge in &self.edges {
                let neighbor = if edge.from == seed.address {
                    Some(edge.to)
                } else if edge.to == seed.address {
                    Some(edge.from)
                } else {
                    None
                };
                if let Some(neighbor) = neighbor {
                    if assigned.insert(neighbor) {
                        cluster.push(neighbor);
                    }
                }
            }
            if cluster.len() > 1 {
                clusters.push(cluster);
            }
        }

        clusters
    }
}

/// Builder aggregating raw transfers into a [`TransferNetwork`]
#[derive(Debug, Clone)]
pub struct TransferNetworkBuilder {
    max_nodes: usize,
}

impl Default for TransferNetworkBuilder {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl TransferNetworkBuilder {
    /// Builder with the default node cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the node cap
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.max(1);
        self
    }

    /// Aggregate transfers into a graph, truncating to the cap
    ///
    /// Empty input yields an empty network. Multiple transfers between
    /// one `(from, to)` pair collapse into a single edge.
    pub fn build(&self, transfers: &[TokenTransfer]) -> TransferNetwork {
        // Aggregate edges; BTreeMap keeps output ordering stable
        let mut edge_map: BTreeMap<(Address, Address), (U256, u64)> = BTreeMap::new();
        for transfer in transfers {
            let entry = edge_map
                .entry((transfer.from, transfer.to))
                .or_insert((U256::ZERO, 0));
            entry.0 += transfer.amount;
            entry.1 += 1;
        }

        let mut addresses: BTreeSet<Address> = BTreeSet::new();
        for (from, to) in edge_map.keys() {
            addresses.insert(*from);
            addresses.insert(*to);
        }

        // Volume-ranked truncation
        let truncated = addresses.len() > self.max_nodes;
        let kept: HashSet<Address> = if truncated {
            let mut ranked: Vec<(Address, U256)> = addresses
                .iter()
                .map(|addr| {
                    let volume = edge_map
                        .iter()
                        .filter(|((from, to), _)| from == addr || to == addr)
                        .fold(U256::ZERO, |acc, (_, (v, _))| acc + *v);
                    (*addr, volume)
                })
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            ranked.truncate(self.max_nodes);
            ranked.into_iter().map(|(addr, _)| addr).collect()
        } else {
            addresses.iter().copied().collect()
        };

        let edges: Vec<NetworkEdge> = edge_map
            .into_iter()
            .filter(|((from, to), _)| kept.contains(from) && kept.contains(to))
            .map(|((from, to), (volume, count))| NetworkEdge {
                from,
                to,
                volume,
                count,
            })
            .collect();

        let nodes = build_nodes(&kept, &edges);
        let diagram = render_diagram(&edges);

        TransferNetwork {
            nodes,
            edges,
            truncated,
            diagram,
        }
    }
}

/// Degree/volume bookkeeping and role assignment for kept nodes
fn build_nodes(kept: &HashSet<Address>, edges: &[NetworkEdge]) -> Vec<NetworkNode> {
    let mut stats: HashMap<Address, (U256, U256, usize, usize)> = kept
        .iter()
        .map(|addr| (*addr, (U256::ZERO, U256::ZERO, 0, 0)))
        .collect();

    for edge in edges {
        if let Some(entry) = stats.get_mut(&edge.from) {
            entry.1 += edge.volume;
            entry.3 += 1;
        }
        if let Some(entry) = stats.get_mut(&edge.to) {
            entry.0 += edge.volume;
            entry.2 += 1;
        }
    }

    let node_count = stats.len().max(1);
    let total_in: U256 = stats.values().fold(U256::ZERO, |acc, s| acc + s.0);
    let total_out: U256 = stats.values().fold(U256::ZERO, |acc, s| acc + s.1);
    let mean_in = total_in / U256::from(node_count);
    let mean_out = total_out / U256::from(node_count);

    let mut nodes: Vec<NetworkNode> = stats
        .into_iter()
        .map(|(address, (in_volume, out_volume, in_degree, out_degree))| {
            let role = if in_degree + out_degree == 0 {
                NodeRole::Isolated
            } else if out_degree >= ROLE_MIN_DEGREE && out_volume >= mean_out {
                NodeRole::Hub
            } else if in_degree >= ROLE_MIN_DEGREE && in_volume >= mean_in {
                NodeRole::Authority
            } else {
                NodeRole::Regular
            };
            NetworkNode {
                address,
                in_volume,
                out_volume,
                in_degree,
                out_degree,
                role,
            }
        })
        .collect();

    nodes.sort_by(|a, b| {
        (b.in_volume + b.out_volume)
            .cmp(&(a.in_volume + a.out_volume))
            .then(a.address.cmp(&b.address))
    });
    nodes
}

/// Render the aggregated edges as a flowchart-style diagram source
fn render_diagram(edges: &[NetworkEdge]) -> String {
    let mut out = String::from("graph LR\n");
    for edge in edges {
        out.push_str(&format!(
            "  {} -->|{} x{}| {}\n",
            short_addr(&edge.from),
            edge.volume,
            edge.count,
            short_addr(&edge.to),
        ));
    }
    out
}

/// Abbreviated address label for diagram output
fn short_addr(addr: &Address) -> String {
    let full = format!("{addr:?}");
    format!("{}..{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    fn transfer(from: Address, to: Address, amount: u64) -> TokenTransfer {
        TokenTransfer {
            from,
            to,
            amount: U256::from(amount),
            gas_used: 0,
            tx_hash: "0x1".to_string(),
        }
    }

    #[test]
    fn parallel_transfers_collapse_into_one_edge() {
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);

        let network = TransferNetworkBuilder::new().build(&[
            transfer(a, b, 10),
            transfer(a, b, 5),
            transfer(b, c, 3),
        ]);

        assert_eq!(network.nodes.len(), 3);
        assert_eq!(network.edges.len(), 2);

        let ab = network
            .edges
            .iter()
            .find(|e| e.from == a && e.to == b)
            .expect("A->B edge");
        assert_eq!(ab.volume, U256::from(15));
        assert_eq!(ab.count, 2);

        let bc = network
            .edges
            .iter()
            .find(|e| e.from == b && e.to == c)
            .expect("B->C edge");
        assert_eq!(bc.volume, U256::from(3));
        assert_eq!(bc.count, 1);
    }

    #[test]
    fn empty_input_builds_empty_network() {
        let network = TransferNetworkBuilder::new().build(&[]);
        assert!(network.nodes.is_empty());
        assert!(network.edges.is_empty());
        assert!(!network.truncated);
    }

    #[test]
    fn truncation_keeps_high_volume_nodes_and_prunes_edges() {
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);
        let d = addr(4);

        let network = TransferNetworkBuilder::new().with_max_nodes(2).build(&[
            transfer(a, b, 1_000),
            transfer(c, d, 1),
        ]);

        assert!(network.truncated);
        assert_eq!(network.nodes.len(), 2);
        // The low-volume pair and its edge are gone
        assert_eq!(network.edges.len(), 1);
        assert!(network.node(&a).is_some());
        assert!(network.node(&b).is_some());
        assert!(network.node(&c).is_none());
    }

    #[test]
    fn hub_and_authority_roles() {
        let hub = addr(1);
        let sink = addr(9);
        let others: Vec<Address> = (2..=4).map(addr).collect();

        let mut transfers = Vec::new();
        for other in &others {
            // hub fans out large volume
            transfers.push(transfer(hub, *other, 1_000));
            // everything drains into the sink
            transfers.push(transfer(*other, sink, 900));
        }

        let network = TransferNetworkBuilder::new().build(&transfers);
        assert_eq!(network.node(&hub).unwrap().role, NodeRole::Hub);
        assert_eq!(network.node(&sink).unwrap().role, NodeRole::Authority);

        let topology = network.topology();
        assert_eq!(topology.hubs, vec![hub]);
        assert_eq!(topology.authorities, vec![sink]);
        assert!(topology.isolated.is_empty());
    }

    #[test]
    fn critical_paths_exceed_mean_and_sort_descending() {
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);
        let d = addr(4);

        let network = TransferNetworkBuilder::new().build(&[
            transfer(a, b, 100),
            transfer(b, c, 50),
            transfer(c, d, 1),
        ]);

        let topology = network.topology();
        // mean volume = 151/3 = 50; edges above it: 100
        assert_eq!(topology.mean_edge_volume, U256::from(50));
        assert_eq!(topology.critical_paths.len(), 1);
        assert_eq!(topology.critical_paths[0].volume, U256::from(100));
    }

    #[test]
    fn clusters_claim_hub_neighbors_once() {
        let hub = addr(1);
        let others: Vec<Address> = (2..=5).map(addr).collect();
        let transfers: Vec<TokenTransfer> = others
            .iter()
            .map(|other| transfer(hub, *other, 500))
            .collect();

        let network = TransferNetworkBuilder::new().build(&transfers);
        let topology = network.topology();

        assert_eq!(topology.clusters.len(), 1);
        let cluster = &topology.clusters[0];
        assert_eq!(cluster[0], hub);
        assert_eq!(cluster.len(), 5);
    }

    #[test]
    fn diagram_lists_every_edge() {
        let network =
            TransferNetworkBuilder::new().build(&[transfer(addr(1), addr(2), 42)]);
        assert!(network.diagram.starts_with("graph LR\n"));
        assert!(network.diagram.contains("|42 x1|"));
    }
}
