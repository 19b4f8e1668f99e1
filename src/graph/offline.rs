//! In-process render target.
//!
//! `OfflineGraph` owns a small node arena (oscillators, gains, panners and a
//! destination) behind a mutex. The control thread creates nodes and commits
//! automation; whoever drives the clock calls one of the render methods. The
//! demo binary calls `render_interleaved` from the cpal callback, tests call
//! `advance` to move time forward.
//!
//! Topology changes (`connect`, `disconnect`) recompute the render order and
//! size the scratch buffers on the control thread, so a render call does no
//! allocation of its own.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{
    dsp::{OscillatorWaveform, ParamChange},
    graph::node::{Frame, Node, RenderCtx},
    io::{AudioClock, NodeId, Param, RenderTarget, TargetError},
};

struct GraphState {
    nodes: BTreeMap<NodeId, Node>,
    /// Nodes reachable from the destination, furthest upstream first.
    order: Vec<NodeId>,
    /// Index into `order` each ordered node feeds.
    sinks: Vec<Option<usize>>,
    /// Per-node input sums for the frame being rendered.
    scratch: Vec<Frame>,
    next_id: u64,
    frame: u64,
    running: bool,
    /// Remaining successful creations before allocation starts failing.
    creation_budget: Option<usize>,
}

pub struct OfflineGraph {
    sample_rate: f32,
    destination: NodeId,
    state: Mutex<GraphState>,
}

impl OfflineGraph {
    pub fn new(sample_rate: f32) -> Self {
        let destination = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(destination, Node::destination());

        let mut state = GraphState {
            nodes,
            order: Vec::new(),
            sinks: Vec::new(),
            scratch: Vec::new(),
            next_id: 1,
            frame: 0,
            running: true,
            creation_budget: None,
        };
        state.reroute(destination);

        Self {
            sample_rate: sample_rate.max(1.0),
            destination,
            state: Mutex::new(state),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The node whose input is the rendered output.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Number of live nodes, not counting the destination.
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len() - 1
    }

    /// Tear the clock down. Rendering produces silence and every mutation fails.
    pub fn close(&self) {
        self.lock().running = false;
        debug!("render target closed");
    }

    /// Allow `budget` more node creations, then fail each one with
    /// `ResourceExhausted`. `None` lifts the limit.
    pub fn set_creation_budget(&self, budget: Option<usize>) {
        self.lock().creation_budget = budget;
    }

    /// Current value of a node parameter at the present clock time.
    pub fn param_value(&self, node: NodeId, param: Param) -> Option<f32> {
        let state = self.lock();
        let t = state.frame as f64 / self.sample_rate as f64;
        state.nodes.get(&node)?.param(param).map(|p| p.value_at(t))
    }

    /// Events pending on a node parameter's timeline.
    pub fn automation_len(&self, node: NodeId, param: Param) -> Option<usize> {
        self.lock().nodes.get(&node)?.param(param).map(|p| p.len())
    }

    /// Render `seconds` of audio and return the peak absolute sample.
    pub fn advance(&self, seconds: f64) -> f32 {
        let frames = (seconds * self.sample_rate as f64).round().max(0.0) as usize;
        let mut buffer = vec![0.0f32; frames * 2];
        self.render_interleaved(&mut buffer, 2);
        buffer.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Render into an interleaved buffer. Mono devices get the channel
    /// average, devices with more than two channels get silence above two.
    pub fn render_interleaved(&self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut state = self.lock();
        if !state.running {
            data.fill(0.0);
            return;
        }

        let frames = data.len() / channels;
        let sample_rate = self.sample_rate;
        let first_frame = state.frame;

        let GraphState {
            nodes,
            order,
            sinks,
            scratch,
            ..
        } = &mut *state;

        let block_start = first_frame as f64 / sample_rate as f64;
        for node in nodes.values_mut() {
            node.settle(block_start);
        }

        for (i, out) in data.chunks_mut(channels).take(frames).enumerate() {
            let ctx = RenderCtx {
                sample_rate,
                time: (first_frame + i as u64) as f64 / sample_rate as f64,
            };
            scratch.fill((0.0, 0.0));

            let mut mixed = (0.0, 0.0);
            for (k, id) in order.iter().enumerate() {
                let Some(node) = nodes.get_mut(id) else {
                    continue;
                };
                let frame = node.process(scratch[k], &ctx);
                match sinks[k] {
                    Some(sink) => {
                        scratch[sink].0 += frame.0;
                        scratch[sink].1 += frame.1;
                    }
                    None if *id == self.destination => mixed = frame,
                    None => {}
                }
            }

            match out {
                [mono] => *mono = 0.5 * (mixed.0 + mixed.1),
                [l, r, rest @ ..] => {
                    *l = mixed.0;
                    *r = mixed.1;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }

        state.frame += frames as u64;
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create(&self, node: Node, kind: &'static str) -> Result<NodeId, TargetError> {
        let mut state = self.lock();
        if !state.running {
            return Err(TargetError::Closed);
        }
        if let Some(budget) = state.creation_budget.as_mut() {
            if *budget == 0 {
                return Err(TargetError::ResourceExhausted(kind));
            }
            *budget -= 1;
        }

        let id = NodeId(state.next_id);
        state.next_id += 1;
        state.nodes.insert(id, node);
        Ok(id)
    }

    fn with_node<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut Node) -> Result<R, TargetError>,
    ) -> Result<R, TargetError> {
        let mut state = self.lock();
        if !state.running {
            return Err(TargetError::Closed);
        }
        let target = state
            .nodes
            .get_mut(&node)
            .ok_or(TargetError::UnknownNode(node))?;
        f(target)
    }
}

impl GraphState {
    /// Recompute the render order after a topology change.
    fn reroute(&mut self, destination: NodeId) {
        let (order, sinks) = render_order(&self.nodes, destination);
        self.scratch.resize(order.len(), (0.0, 0.0));
        self.order = order;
        self.sinks = sinks;
    }
}

/// Nodes reachable from the destination, furthest upstream first, with the
/// index each one feeds into.
fn render_order(
    nodes: &BTreeMap<NodeId, Node>,
    destination: NodeId,
) -> (Vec<NodeId>, Vec<Option<usize>>) {
    let limit = nodes.len();
    let depth_of = |mut id: NodeId| -> Option<usize> {
        let mut depth = 0;
        while id != destination {
            id = nodes.get(&id)?.output?;
            depth += 1;
            if depth > limit {
                return None; // cycle
            }
        }
        Some(depth)
    };

    let mut ordered: Vec<(NodeId, usize)> = nodes
        .keys()
        .filter_map(|&id| depth_of(id).map(|d| (id, d)))
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let index: HashMap<NodeId, usize> = ordered
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (*id, i))
        .collect();
    let sinks = ordered
        .iter()
        .map(|(id, _)| {
            nodes
                .get(id)
                .and_then(|node| node.output)
                .and_then(|out| index.get(&out).copied())
        })
        .collect();

    (ordered.into_iter().map(|(id, _)| id).collect(), sinks)
}

impl AudioClock for OfflineGraph {
    fn current_time(&self) -> f64 {
        self.lock().frame as f64 / self.sample_rate as f64
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }
}

impl RenderTarget for OfflineGraph {
    fn contains(&self, node: NodeId) -> bool {
        self.lock().nodes.contains_key(&node)
    }

    fn create_oscillator(
        &self,
        waveform: OscillatorWaveform,
        frequency: f32,
    ) -> Result<NodeId, TargetError> {
        self.create(Node::oscillator(waveform, frequency), "oscillator")
    }

    fn create_gain(&self, gain: f32) -> Result<NodeId, TargetError> {
        self.create(Node::gain(gain), "gain")
    }

    fn create_panner(&self, pan: f32) -> Result<NodeId, TargetError> {
        self.create(Node::panner(pan), "panner")
    }

    fn schedule(
        &self,
        node: NodeId,
        param: Param,
        change: ParamChange,
    ) -> Result<(), TargetError> {
        self.with_node(node, |n| {
            n.param_mut(param)
                .map(|timeline| timeline.apply(change))
                .ok_or(TargetError::WrongParam { node, param })
        })
    }

    fn start_node(&self, node: NodeId, at: f64) -> Result<(), TargetError> {
        self.with_node(node, |n| {
            let (start, _) = n.transport_mut().ok_or(TargetError::WrongParam {
                node,
                param: Param::Frequency,
            })?;
            *start = Some(at);
            Ok(())
        })
    }

    fn stop_node(&self, node: NodeId, at: f64) -> Result<(), TargetError> {
        self.with_node(node, |n| {
            let (_, stop) = n.transport_mut().ok_or(TargetError::WrongParam {
                node,
                param: Param::Frequency,
            })?;
            *stop = Some(at);
            Ok(())
        })
    }

    fn connect(&self, from: NodeId, to: NodeId) -> Result<(), TargetError> {
        let mut state = self.lock();
        if !state.running {
            return Err(TargetError::Closed);
        }
        if !state.nodes.contains_key(&to) {
            return Err(TargetError::UnknownNode(to));
        }
        let node = state
            .nodes
            .get_mut(&from)
            .ok_or(TargetError::UnknownNode(from))?;
        node.output = Some(to);
        state.reroute(self.destination);
        Ok(())
    }

    fn disconnect(&self, node: NodeId) -> Result<(), TargetError> {
        if node == self.destination {
            return Err(TargetError::UnknownNode(node));
        }
        let mut state = self.lock();
        state
            .nodes
            .remove(&node)
            .ok_or(TargetError::UnknownNode(node))?;
        for other in state.nodes.values_mut() {
            if other.output == Some(node) {
                other.output = None;
            }
        }
        state.reroute(self.destination);
        Ok(())
    }
}
