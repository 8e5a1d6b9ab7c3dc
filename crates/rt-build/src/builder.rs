//! Twelve-stage graph build.
//!
//! # Stages
//!
//! | #  | Stage               | Scope           | On failure                |
//! |----|---------------------|-----------------|---------------------------|
//! | 1  | parse input         | facility        | n/a                       |
//! | 2  | rail edges          | per area        | **mandatory** (empty = fail) |
//! | 3  | rail index          | per area        | n/a                       |
//! | 4  | rail nodes          | per area        | **mandatory**             |
//! | 5  | port nodes          | facility branch | best effort               |
//! | 6  | stations, transfers | per area        | **mandatory**             |
//! | 7  | equipment, vehicles | facility branch | best effort               |
//! | 8  | global edge index   | joined          | dangling edges dropped    |
//! | 9  | node edge sets      | joined          | n/a                       |
//! | 10 | branch-join groups  | per area        | best effort               |
//! | 11 | zones and loops     | per area        | best effort, warns        |
//! | 12 | port aliases        | facility        | best effort               |
//!
//! Stages 2–4 for every area run on the build pool alongside stages 5 and 7,
//! which are independent of the rail layout.  Everything stays owned until
//! the last stage; entities are wrapped in `Arc` only when the snapshot is
//! assembled.
//!
//! The builder never touches the live snapshot.  Carrying runtime state
//! forward is [`carry_forward`](crate::carry_forward)'s job, run inside the
//! store's publish.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, info, info_span, warn};

use rt_core::{
    CadPoint, Config, Direction, DrawPoint, EdgeId, EquipmentId, Millis, NodeId, PortKind,
    StationId, VehicleId, ZoneId, ZoneKey,
};
use rt_graph::{
    bounded_walk, BranchJoin, ConveyorEdge, Equipment, EquipmentKind, Learner, NetworkSnapshot,
    Node, NodeKind, PortPoint, RailCutRecord, RailEdge, RailPoint, Station, StationLocation,
    StkRmEdge, TransferEdge, TransferKind, Vehicle, Walk, ZoneInfo,
};

use crate::raw::{AreaTopology, BuildInput, PortRecord, RawPoint, RawRegion, RmDirection, Segment};
use crate::{BuildError, BuildResult};

/// Hand-off distance between rail and port, by port kind.
const STOCKER_PORT_TRANSFER_MM: f64 = 2_000.0;
const STOCKER_BUFFER_TRANSFER_MM: f64 = 1_000.0;
const DEFAULT_TRANSFER_MM: f64 = 4_000.0;

fn transfer_length_mm(kind: PortKind) -> f64 {
    match kind {
        PortKind::StockerPort => STOCKER_PORT_TRANSFER_MM,
        PortKind::StockerBuffer => STOCKER_BUFFER_TRANSFER_MM,
        _ => DEFAULT_TRANSFER_MM,
    }
}

/// Port ids that name a station placeholder rather than a real port.
fn is_linkable_port(name: &str) -> bool {
    !name.is_empty() && !name.contains('-')
}

// ── Intermediate products ─────────────────────────────────────────────────────

/// Rail graph of one area while it is still being assembled.
struct AreaGraph<'a> {
    raw:            &'a AreaTopology,
    nodes:          FxHashMap<NodeId, Node>,
    rail_edges:     FxHashMap<EdgeId, RailEdge>,
    rail_out:       FxHashMap<NodeId, Vec<EdgeId>>,
    rail_in:        FxHashMap<NodeId, Vec<EdgeId>>,
    cuts:           Vec<RailCutRecord>,
    stations:       FxHashMap<StationId, Station>,
    transfer_edges: FxHashMap<EdgeId, TransferEdge>,
    branch_joins:   Vec<BranchJoin>,
    zones:          Vec<ZoneInfo>,
}

impl AreaGraph<'_> {
    fn name(&self) -> &str {
        &self.raw.name
    }
}

/// Output of stage 5.
#[derive(Default)]
struct PortNodes {
    nodes:   FxHashMap<NodeId, Node>,
    by_name: FxHashMap<String, (NodeId, PortKind)>,
    /// Ports of bridged equipment; they get no node.
    bridged: FxHashSet<String>,
}

/// Output of stage 7.
#[derive(Default)]
struct EquipmentParts {
    nodes:          FxHashMap<NodeId, Node>,
    stk_rm_edges:   FxHashMap<EdgeId, StkRmEdge>,
    conveyor_edges: FxHashMap<EdgeId, ConveyorEdge>,
    equipment:      FxHashMap<EquipmentId, Equipment>,
    vehicles:       FxHashMap<VehicleId, Vehicle>,
}

/// Output of stage 8.
#[derive(Default)]
struct EdgeIndex {
    from: FxHashMap<NodeId, Vec<EdgeId>>,
    to:   FxHashMap<NodeId, Vec<EdgeId>>,
}

/// Remembered id of a branch-join group, keyed by its first rail edge.
#[derive(Clone, Debug)]
struct JoinIdentity {
    id:   EdgeId,
    from: NodeId,
    to:   NodeId,
}

// ── GraphBuilder ──────────────────────────────────────────────────────────────

/// Builds [`NetworkSnapshot`]s from [`BuildInput`] on a dedicated pool.
///
/// One builder serves one facility for the lifetime of the process: its
/// branch-join identity cache is what keeps group ids stable when a group's
/// first edge survives a rebuild.
pub struct GraphBuilder {
    config:     Config,
    pool:       rayon::ThreadPool,
    identities: Mutex<FxHashMap<EdgeId, JoinIdentity>>,
}

impl GraphBuilder {
    pub fn new(config: Config) -> BuildResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.build.workers)
            .thread_name(|i| format!("rt-build-{i}"))
            .build()?;
        Ok(Self { config, pool, identities: Mutex::new(FxHashMap::default()) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of branch-join identities remembered so far.
    pub fn remembered_joins(&self) -> usize {
        self.identities.lock().len()
    }

    /// Run all stages and return an unpublished snapshot.
    ///
    /// # Errors
    ///
    /// [`BuildError::MandatoryStage`] when stage 2 or 4 fails or yields
    /// nothing for some area, [`BuildError::DuplicateStation`] from stage 6,
    /// and [`BuildError::Graph`] if the assembled snapshot has a dangling
    /// edge.
    pub fn build(&self, input: &BuildInput) -> BuildResult<NetworkSnapshot> {
        let started = Instant::now();
        let result = self.pool.install(|| self.run_stages(input));
        match &result {
            Ok(snap) => info!(
                facility = %input.facility,
                nodes = snap.node_count(),
                edges = snap.edge_count(),
                stations = snap.stations.len(),
                vehicles = snap.vehicles.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "build complete"
            ),
            Err(err) => error!(facility = %input.facility, %err, "build failed; nothing published"),
        }
        result
    }

    fn run_stages(&self, input: &BuildInput) -> BuildResult<NetworkSnapshot> {
        let fab = input.facility.as_str();
        let bridge_from: Vec<String> =
            self.config.facility(fab).map(|f| f.bridge_from.clone()).unwrap_or_default();
        let learner = Learner::new(&self.config.learner);

        {
            let _stage = info_span!("build_stage", stage = 1).entered();
            info!(
                facility = fab,
                areas = input.areas.len(),
                ports = input.ports.len(),
                equipment = input.equipment.len(),
                vehicles = input.vehicles.len(),
                "build input"
            );
        }

        let (areas, (mut ports, mut parts)) = rayon::join(
            || input.areas.par_iter().map(|a| self.area_rail(fab, a)).collect::<Vec<_>>(),
            || {
                rayon::join(
                    || self.port_nodes(fab, input, &bridge_from),
                    || self.equipment(fab, input, &bridge_from, &learner),
                )
            },
        );
        let mut areas: Vec<AreaGraph<'_>> = areas.into_iter().collect::<BuildResult<_>>()?;

        areas
            .par_iter_mut()
            .map(|area| self.stations(fab, area, &ports))
            .collect::<BuildResult<()>>()?;

        let index = global_index(&mut areas, &ports, &mut parts);
        node_edge_sets(&mut areas, &mut ports, &mut parts, index);

        areas.par_iter_mut().for_each(|area| {
            self.branch_joins(fab, area);
            self.regions(fab, area);
        });

        let aliases = port_aliases(input, &ports);

        assemble(fab, learner, areas, ports, parts, aliases)
    }

    // ── Stages 2–4 ────────────────────────────────────────────────────────

    fn area_rail<'a>(&self, fab: &str, raw: &'a AreaTopology) -> BuildResult<AreaGraph<'a>> {
        let area = raw.name.as_str();

        let (rail_edges, cuts) = {
            let _stage = info_span!("build_stage", stage = 2, area).entered();
            let (edges, cuts) = self.rail_edges(fab, raw);
            if edges.is_empty() {
                return Err(BuildError::MandatoryStage {
                    stage:  2,
                    area:   area.to_owned(),
                    reason: "no rail edges".into(),
                });
            }
            debug!(edges = edges.len(), cuts = cuts.len(), "rail edges");
            (edges, cuts)
        };

        let (rail_out, rail_in) = {
            let _stage = info_span!("build_stage", stage = 3, area).entered();
            rail_index(&rail_edges)
        };

        let nodes = {
            let _stage = info_span!("build_stage", stage = 4, area).entered();
            rail_nodes(fab, raw, &rail_edges, &rail_out, &rail_in)?
        };

        Ok(AreaGraph {
            raw,
            nodes,
            rail_edges,
            rail_out,
            rail_in,
            cuts,
            stations: FxHashMap::default(),
            transfer_edges: FxHashMap::default(),
            branch_joins: Vec::new(),
            zones: Vec::new(),
        })
    }

    /// Stage 2: one rail edge per populated side of every point.
    fn rail_edges(
        &self,
        fab: &str,
        raw: &AreaTopology,
    ) -> (FxHashMap<EdgeId, RailEdge>, Vec<RailCutRecord>) {
        let area = raw.name.as_str();
        let points: FxHashMap<u32, &RawPoint> = raw.points.iter().map(|p| (p.address, p)).collect();
        let cut_set: FxHashSet<Segment> = raw.cuts.iter().copied().collect();

        let mut edges = FxHashMap::default();
        let mut cuts = Vec::new();

        for p in &raw.points {
            let sides = [
                (Direction::Left, p.left_address, p.left_distance_mm, p.left_speed),
                (Direction::Right, p.right_address, p.right_distance_mm, p.right_speed),
            ];
            for (direction, to, distance, speed) in sides {
                if to == 0 {
                    continue;
                }
                let Some(target) = points.get(&to) else {
                    warn!(from = p.address, to, "rail edge to unknown address skipped");
                    continue;
                };
                let length = if distance > 0.0 { distance } else { p.draw.distance_to(target.draw) };
                let max_velocity = raw
                    .speed_classes
                    .get(&speed)
                    .copied()
                    .filter(|v| *v > 0.0)
                    .unwrap_or(self.config.build.default_max_velocity);

                let id = EdgeId::rail(fab, area, p.address, to);
                let edge = RailEdge::new(
                    id.clone(),
                    NodeId::rail(fab, area, p.address),
                    NodeId::rail(fab, area, to),
                    area,
                    p.address,
                    to,
                    direction,
                    length,
                )
                .with_max_velocity(max_velocity);

                if cut_set.contains(&(p.address, to)) {
                    edge.set_available(false);
                    cuts.push(RailCutRecord {
                        edge: id.clone(),
                        area: area.to_owned(),
                        from_address: p.address,
                        to_address: to,
                    });
                }
                edges.insert(id, edge);
            }
        }

        cuts.sort_by(|a, b| a.edge.cmp(&b.edge));
        (edges, cuts)
    }

    // ── Stage 5 ───────────────────────────────────────────────────────────

    fn port_nodes(&self, fab: &str, input: &BuildInput, bridge_from: &[String]) -> PortNodes {
        let _stage = info_span!("build_stage", stage = 5).entered();
        let mut out = PortNodes::default();

        for rec in &input.ports {
            if bridge_from.contains(&rec.equipment) {
                out.bridged.insert(rec.name.clone());
                continue;
            }
            let id = NodeId::port(fab, rec.kind, &rec.name);
            if out.by_name.insert(rec.name.clone(), (id.clone(), rec.kind)).is_some() {
                warn!(port = %rec.name, "duplicate port record, last one wins");
            }
            let kind = NodeKind::Port(PortPoint {
                kind:      rec.kind,
                name:      rec.name.clone(),
                equipment: rec.equipment.clone(),
                area:      rec.area.clone(),
            });
            out.nodes.insert(id.clone(), Node::new(id, kind, rec.draw, rec.cad));
        }

        debug!(ports = out.nodes.len(), bridged = out.bridged.len(), "port nodes");
        out
    }

    // ── Stage 6 ───────────────────────────────────────────────────────────

    fn stations(&self, fab: &str, area: &mut AreaGraph<'_>, ports: &PortNodes) -> BuildResult<()> {
        let _stage = info_span!("build_stage", stage = 6, area = area.name()).entered();
        let raw = area.raw;
        let name = raw.name.as_str();
        let points: FxHashMap<u32, &RawPoint> = raw.points.iter().map(|p| (p.address, p)).collect();

        for rs in &raw.stations {
            let id = StationId::mint(fab, name, rs.station_no);
            if area.stations.contains_key(&id) {
                return Err(BuildError::DuplicateStation(id.to_string()));
            }

            let Some(point) = points.get(&rs.address) else {
                warn!(station = %id, address = rs.address, "station on unknown rail point skipped");
                continue;
            };
            let to = match rs.location {
                StationLocation::LeftBranch | StationLocation::NoCondition => point.left_address,
                StationLocation::RightBranch => point.right_address,
            };
            let rail_edge = EdgeId::rail(fab, name, rs.address, to);
            if to == 0 || !area.rail_edges.contains_key(&rail_edge) {
                warn!(station = %id, address = rs.address, "station has no rail edge on its side");
                continue;
            }

            let mut station = Station::new(
                id.clone(),
                name,
                rs.station_no,
                rs.address,
                rs.location,
                rs.kind,
                rail_edge.clone(),
                rs.port_id.clone(),
            );
            let rail_node = NodeId::rail(fab, name, rs.address);

            if ports.bridged.contains(&rs.port_id) {
                if let Some(NodeKind::Rail(p)) = area.nodes.get_mut(&rail_node).map(|n| &mut n.kind) {
                    p.bridged = true;
                }
            } else {
                let linked = if is_linkable_port(&rs.port_id) { ports.by_name.get(&rs.port_id) } else { None };
                let Some((port_node, port_kind)) = linked else {
                    debug!(station = %id, port = %rs.port_id, "station without a valid port left unlinked");
                    continue;
                };
                let length = transfer_length_mm(*port_kind);
                let conveyor = *port_kind == PortKind::ConveyorPort;

                if rs.kind.supports_acquire() {
                    let edge = TransferEdge::new(
                        EdgeId::acquire(fab, name, rs.station_no),
                        port_node.clone(),
                        rail_node.clone(),
                        TransferKind::Acquire,
                        id.clone(),
                        length,
                        conveyor,
                    );
                    station.acquire_edge = Some(edge.id.clone());
                    area.transfer_edges.insert(edge.id.clone(), edge);
                }
                if rs.kind.supports_deposit() {
                    let edge = TransferEdge::new(
                        EdgeId::deposit(fab, name, rs.station_no),
                        rail_node.clone(),
                        port_node.clone(),
                        TransferKind::Deposit,
                        id.clone(),
                        length,
                        conveyor,
                    );
                    station.deposit_edge = Some(edge.id.clone());
                    area.transfer_edges.insert(edge.id.clone(), edge);
                }
                station.port_node = Some(port_node.clone());
            }

            if let Some(edge) = area.rail_edges.get_mut(&rail_edge) {
                edge.station_ids.push(id.clone());
            }
            area.stations.insert(id, station);
        }

        debug!(stations = area.stations.len(), transfers = area.transfer_edges.len(), "stations");
        Ok(())
    }

    // ── Stage 7 ───────────────────────────────────────────────────────────

    fn equipment(
        &self,
        fab: &str,
        input: &BuildInput,
        bridge_from: &[String],
        learner: &Learner,
    ) -> EquipmentParts {
        let _stage = info_span!("build_stage", stage = 7).entered();
        let records: FxHashMap<&str, &PortRecord> =
            input.ports.iter().map(|p| (p.name.as_str(), p)).collect();
        let mut out = EquipmentParts::default();

        for eq in &input.equipment {
            let ports: Vec<(NodeId, &PortRecord)> = eq
                .ports
                .iter()
                .filter_map(|name| match records.get(name.as_str()) {
                    Some(rec) => Some((NodeId::port(fab, rec.kind, &rec.name), *rec)),
                    None => {
                        warn!(equipment = %eq.name, port = %name, "equipment lists an unknown port");
                        None
                    }
                })
                .collect();

            if bridge_from.contains(&eq.name) {
                debug!(equipment = %eq.name, "bridged equipment gets no internal edges");
            } else {
                match eq.kind {
                    EquipmentKind::Stocker => stocker_edges(fab, &eq.name, &ports, learner, &mut out),
                    EquipmentKind::Conveyor => {
                        for pair in ports.windows(2) {
                            let ((a, ra), (b, rb)) = (&pair[0], &pair[1]);
                            let edge = ConveyorEdge::new(
                                EdgeId::conveyor(fab, &eq.name, &ra.name, &rb.name),
                                a.clone(),
                                b.clone(),
                                eq.name.as_str(),
                                learner,
                            );
                            out.conveyor_edges.insert(edge.id.clone(), edge);
                        }
                    }
                    EquipmentKind::ProcessTool | EquipmentKind::Interface => {}
                }
            }

            let id = EquipmentId::mint(fab, &eq.name);
            out.equipment.insert(
                id.clone(),
                Equipment {
                    id,
                    name: eq.name.clone(),
                    kind: eq.kind,
                    ports: ports.into_iter().map(|(n, _)| n).collect(),
                },
            );
        }

        for v in &input.vehicles {
            let id = VehicleId::mint(fab, &v.area, &v.name);
            out.vehicles.insert(id.clone(), Vehicle::new(id, v.name.as_str(), v.area.as_str()));
        }

        debug!(
            equipment = out.equipment.len(),
            rm_edges = out.stk_rm_edges.len(),
            conveyor_edges = out.conveyor_edges.len(),
            vehicles = out.vehicles.len(),
            "equipment"
        );
        out
    }

    // ── Stage 10 ──────────────────────────────────────────────────────────

    /// Group plain rail runs between decision points.
    fn branch_joins(&self, fab: &str, area: &mut AreaGraph<'_>) {
        let _stage = info_span!("build_stage", stage = 10, area = area.name()).entered();
        let name = area.raw.name.as_str();
        let nodes = &area.nodes;
        let decision = |id: &NodeId| {
            nodes
                .get(id)
                .and_then(Node::rail_point)
                .is_none_or(|p| p.rail_branch || p.rail_junction)
        };
        let address = |id: &NodeId| nodes.get(id).and_then(Node::rail_point).map_or(0, |p| p.address);

        let mut starts: Vec<&NodeId> = nodes
            .iter()
            .filter(|(_, n)| n.rail_point().is_some_and(|p| p.rail_branch || p.rail_junction))
            .map(|(id, _)| id)
            .collect();
        starts.sort();

        let mut joins = Vec::new();
        for start in starts {
            for first in area.rail_out.get(start).into_iter().flatten() {
                let Some(mut edge) = area.rail_edges.get(first) else { continue };
                let mut members = vec![first.clone()];
                let mut length = edge.length_mm;
                let mut seen: FxHashSet<&EdgeId> = FxHashSet::default();
                seen.insert(first);

                while !decision(&edge.to) {
                    let next = match area.rail_out.get(&edge.to).map(Vec::as_slice) {
                        Some([only]) => only,
                        _ => break,
                    };
                    if !seen.insert(next) {
                        break;
                    }
                    let Some(e) = area.rail_edges.get(next) else { break };
                    members.push(next.clone());
                    length += e.length_mm;
                    edge = e;
                }

                let end = edge.to.clone();
                let direction = area.rail_edges.get(first).map_or(Direction::Left, |e| e.direction);
                let id = self.join_identity(first, start, &end, || {
                    EdgeId::branch_join(fab, name, address(start), direction, address(&end))
                });
                joins.push(BranchJoin {
                    id,
                    area: name.to_owned(),
                    from: start.clone(),
                    to: end,
                    edges: members,
                    length_mm: length,
                });
            }
        }

        for join in &joins {
            for e in &join.edges {
                if let Some(edge) = area.rail_edges.get_mut(e) {
                    edge.branch_join = Some(join.id.clone());
                }
            }
        }
        debug!(groups = joins.len(), "branch joins");
        area.branch_joins = joins;
    }

    fn join_identity(
        &self,
        first: &EdgeId,
        from: &NodeId,
        to: &NodeId,
        mint: impl FnOnce() -> EdgeId,
    ) -> EdgeId {
        let mut cache = self.identities.lock();
        match cache.get(first) {
            Some(known) if &known.from == from && &known.to == to => known.id.clone(),
            _ => {
                let id = mint();
                cache.insert(
                    first.clone(),
                    JoinIdentity { id: id.clone(), from: from.clone(), to: to.clone() },
                );
                id
            }
        }
    }

    // ── Stage 11 ──────────────────────────────────────────────────────────

    /// Tag zone and loop membership on rail edges.
    fn regions(&self, fab: &str, area: &mut AreaGraph<'_>) {
        let _stage = info_span!("build_stage", stage = 11, area = area.name()).entered();
        let raw = area.raw;
        let name = raw.name.as_str();

        let zone_walks: Vec<(&RawRegion, Walk<EdgeId>)> =
            raw.zones.iter().map(|z| (z, self.walk_region(fab, area, z, "zone"))).collect();
        let loop_walks: Vec<(&RawRegion, Walk<EdgeId>)> =
            raw.loops.iter().map(|l| (l, self.walk_region(fab, area, l, "loop"))).collect();

        let mut zones = Vec::with_capacity(zone_walks.len());
        for (region, walk) in zone_walks {
            let zone = ZoneId(region.id);
            let mut addresses: Vec<String> = Vec::new();
            let mut ports: Vec<String> = Vec::new();
            for id in &walk.items {
                let Some(edge) = area.rail_edges.get_mut(id) else { continue };
                edge.zone = zone;
                let addr = edge.from_address.to_string();
                if !addresses.contains(&addr) {
                    addresses.push(addr);
                }
                ports.extend(
                    edge.station_ids
                        .iter()
                        .filter_map(|s| area.stations.get(s))
                        .map(|s| s.port_name.clone())
                        .filter(|p| !p.is_empty()),
                );
            }
            ports.sort();
            ports.dedup();
            zones.push(ZoneInfo {
                key: ZoneKey::mint(fab, name, zone),
                area: name.to_owned(),
                zone,
                edges: walk.items,
                addresses,
                ports,
            });
        }

        for (region, walk) in loop_walks {
            for id in &walk.items {
                if let Some(edge) = area.rail_edges.get_mut(id) {
                    edge.loop_id = region.id;
                }
            }
        }

        debug!(zones = zones.len(), loops = raw.loops.len(), "regions");
        area.zones = zones;
    }

    /// Breadth-first walk from a region's entry segments to its exits.
    fn walk_region(
        &self,
        fab: &str,
        area: &AreaGraph<'_>,
        region: &RawRegion,
        what: &'static str,
    ) -> Walk<EdgeId> {
        let name = area.name();
        let limit = self.config.build.zone_walk_limit;
        let exits: FxHashSet<Segment> = region.exits.iter().copied().collect();

        let starts: Vec<EdgeId> = region
            .entries
            .iter()
            .map(|&(from, to)| EdgeId::rail(fab, name, from, to))
            .filter(|id| {
                let known = area.rail_edges.contains_key(id);
                if !known {
                    warn!(region = what, id = region.id, entry = %id, "entry segment not in layout");
                }
                known
            })
            .collect();

        let walk = bounded_walk(
            starts,
            |id: &EdgeId| {
                area.rail_edges
                    .get(id)
                    .and_then(|e| area.rail_out.get(&e.to))
                    .cloned()
                    .unwrap_or_default()
            },
            |id: &EdgeId| {
                area.rail_edges
                    .get(id)
                    .is_some_and(|e| exits.contains(&(e.from_address, e.to_address)))
            },
            limit,
        );

        if walk.cycle {
            warn!(
                region = what,
                id = region.id,
                edges = walk.items.len(),
                "region walk closed a cycle without reaching an exit"
            );
        }
        if walk.truncated {
            warn!(region = what, id = region.id, limit, "region walk truncated");
        }
        walk
    }
}

// ── Free stage helpers ────────────────────────────────────────────────────────

/// Stage 3: sorted rail adjacency.
fn rail_index(
    edges: &FxHashMap<EdgeId, RailEdge>,
) -> (FxHashMap<NodeId, Vec<EdgeId>>, FxHashMap<NodeId, Vec<EdgeId>>) {
    let mut out: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
    let mut into: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
    for (id, e) in edges {
        out.entry(e.from.clone()).or_default().push(id.clone());
        into.entry(e.to.clone()).or_default().push(id.clone());
    }
    for list in out.values_mut().chain(into.values_mut()) {
        list.sort();
    }
    (out, into)
}

/// Stage 4: one node per point, flags from rail degree.
fn rail_nodes(
    fab: &str,
    raw: &AreaTopology,
    edges: &FxHashMap<EdgeId, RailEdge>,
    rail_out: &FxHashMap<NodeId, Vec<EdgeId>>,
    rail_in: &FxHashMap<NodeId, Vec<EdgeId>>,
) -> BuildResult<FxHashMap<NodeId, Node>> {
    let area = raw.name.as_str();
    let mut nodes = FxHashMap::default();

    for p in &raw.points {
        let id = NodeId::rail(fab, area, p.address);
        let outs = rail_out.get(&id).map_or(0, Vec::len);
        let ins = rail_in.get(&id).map_or(0, Vec::len);
        let point = RailPoint {
            area:          area.to_owned(),
            address:       p.address,
            left_address:  p.left_address,
            right_address: p.right_address,
            rail_branch:   outs > 1,
            rail_junction: ins > 1,
            terminal:      outs == 0 || ins == 0 || p.left_address == p.right_address,
            bridged:       false,
        };
        nodes.insert(id.clone(), Node::new(id, NodeKind::Rail(point), p.draw, p.cad));
    }

    for e in edges.values() {
        for end in [&e.from, &e.to] {
            if !nodes.contains_key(end) {
                return Err(BuildError::MandatoryStage {
                    stage:  4,
                    area:   area.to_owned(),
                    reason: format!("edge {} has no node {end}", e.id),
                });
            }
        }
    }
    Ok(nodes)
}

/// RM node plus per-port RM edges for one stocker.
fn stocker_edges(
    fab: &str,
    stocker: &str,
    ports: &[(NodeId, &PortRecord)],
    learner: &Learner,
    out: &mut EquipmentParts,
) {
    let rm = NodeId::stocker_rm(fab, stocker);
    out.nodes.insert(
        rm.clone(),
        Node::new(
            rm.clone(),
            NodeKind::StockerRm { stocker: stocker.to_owned() },
            DrawPoint::default(),
            CadPoint::default(),
        ),
    );

    for (port, rec) in ports {
        let (inbound, outbound) = match rec.rm_direction {
            RmDirection::In => (true, false),
            RmDirection::Out => (false, true),
            RmDirection::Both => (true, true),
        };
        if inbound {
            let edge = StkRmEdge::new(
                EdgeId::stocker_rm(fab, stocker, &rec.name, false),
                port.clone(),
                rm.clone(),
                stocker,
                false,
                learner,
            );
            out.stk_rm_edges.insert(edge.id.clone(), edge);
        }
        if outbound {
            let edge = StkRmEdge::new(
                EdgeId::stocker_rm(fab, stocker, &rec.name, true),
                rm.clone(),
                port.clone(),
                stocker,
                true,
                learner,
            );
            out.stk_rm_edges.insert(edge.id.clone(), edge);
        }
    }
}

/// Stage 8: drop edges whose endpoints never became nodes, then index the
/// rest by endpoint.
fn global_index(
    areas: &mut [AreaGraph<'_>],
    ports: &PortNodes,
    parts: &mut EquipmentParts,
) -> EdgeIndex {
    let _stage = info_span!("build_stage", stage = 8).entered();
    let known: FxHashSet<NodeId> = areas
        .iter()
        .flat_map(|a| a.nodes.keys())
        .chain(ports.nodes.keys())
        .chain(parts.nodes.keys())
        .cloned()
        .collect();
    let resolves = |id: &EdgeId, from: &NodeId, to: &NodeId| {
        let ok = known.contains(from) && known.contains(to);
        if !ok {
            warn!(edge = %id, "edge endpoint missing, edge dropped");
        }
        ok
    };

    for area in areas.iter_mut() {
        area.transfer_edges.retain(|id, e| resolves(id, &e.from, &e.to));
    }
    parts.stk_rm_edges.retain(|id, e| resolves(id, &e.from, &e.to));
    parts.conveyor_edges.retain(|id, e| resolves(id, &e.from, &e.to));

    let mut index = EdgeIndex::default();
    let mut add = |id: &EdgeId, from: &NodeId, to: &NodeId| {
        index.from.entry(from.clone()).or_default().push(id.clone());
        index.to.entry(to.clone()).or_default().push(id.clone());
    };
    for area in areas.iter() {
        area.rail_edges.values().for_each(|e| add(&e.id, &e.from, &e.to));
        area.transfer_edges.values().for_each(|e| add(&e.id, &e.from, &e.to));
    }
    parts.stk_rm_edges.values().for_each(|e| add(&e.id, &e.from, &e.to));
    parts.conveyor_edges.values().for_each(|e| add(&e.id, &e.from, &e.to));

    for list in index.from.values_mut().chain(index.to.values_mut()) {
        list.sort();
    }
    index
}

/// Stage 9: every node learns its full in/out edge sets.
fn node_edge_sets(
    areas: &mut [AreaGraph<'_>],
    ports: &mut PortNodes,
    parts: &mut EquipmentParts,
    mut index: EdgeIndex,
) {
    let _stage = info_span!("build_stage", stage = 9).entered();
    let nodes = areas
        .iter_mut()
        .flat_map(|a| a.nodes.values_mut())
        .chain(ports.nodes.values_mut())
        .chain(parts.nodes.values_mut());
    for node in nodes {
        let ins = index.to.remove(&node.id).unwrap_or_default();
        let outs = index.from.remove(&node.id).unwrap_or_default();
        node.set_adjacency(ins, outs);
    }
}

/// Stage 12: port name and alias → port node.
fn port_aliases(input: &BuildInput, ports: &PortNodes) -> FxHashMap<String, NodeId> {
    let _stage = info_span!("build_stage", stage = 12).entered();
    let mut map: FxHashMap<String, NodeId> =
        ports.by_name.iter().map(|(name, (id, _))| (name.clone(), id.clone())).collect();
    for rec in &input.aliases {
        match ports.by_name.get(&rec.port) {
            Some((id, _)) => {
                map.insert(rec.alias.clone(), id.clone());
            }
            None => debug!(alias = %rec.alias, port = %rec.port, "alias for unknown port skipped"),
        }
    }
    map
}

/// Wrap everything in `Arc`, derive indices, and check references.
fn assemble(
    fab: &str,
    learner: Learner,
    areas: Vec<AreaGraph<'_>>,
    ports: PortNodes,
    parts: EquipmentParts,
    aliases: FxHashMap<String, NodeId>,
) -> BuildResult<NetworkSnapshot> {
    let mut snap = NetworkSnapshot::empty(fab, learner);
    snap.built_at = Millis::now();

    for area in areas {
        snap.nodes.extend(area.nodes.into_iter().map(|(k, n)| (k, Arc::new(n))));
        snap.rail_edges.extend(area.rail_edges.into_iter().map(|(k, e)| (k, Arc::new(e))));
        snap.transfer_edges.extend(area.transfer_edges.into_iter().map(|(k, e)| (k, Arc::new(e))));
        snap.stations.extend(area.stations.into_iter().map(|(k, s)| (k, Arc::new(s))));
        snap.rail_cuts.extend(area.cuts);
        snap.branch_joins.extend(area.branch_joins.into_iter().map(|j| (j.id.clone(), j)));
        for zone in area.zones {
            if zone.zone.is_counted() {
                snap.zone_counts.register(zone.key.clone());
            }
            snap.zones.insert(zone.key.clone(), zone);
        }
    }

    snap.nodes.extend(ports.nodes.into_iter().map(|(k, n)| (k, Arc::new(n))));
    snap.nodes.extend(parts.nodes.into_iter().map(|(k, n)| (k, Arc::new(n))));
    snap.stk_rm_edges.extend(parts.stk_rm_edges.into_iter().map(|(k, e)| (k, Arc::new(e))));
    snap.conveyor_edges.extend(parts.conveyor_edges.into_iter().map(|(k, e)| (k, Arc::new(e))));
    snap.vehicles.extend(parts.vehicles.into_iter().map(|(k, v)| (k, Arc::new(v))));
    snap.equipment = parts.equipment;
    snap.port_aliases = aliases;

    snap.rebuild_indices();
    snap.check_references()?;
    Ok(snap)
}
