//! Process-wide backend runtime.
//!
//! The first initialization of a backend kind decides the accelerator this process
//! uses and sizes the worker pool; the result is stored once per kind and every later
//! call returns it unchanged. Device selection follows the per-node rule
//! `device = node-local rank % visible devices`.

use std::sync::OnceLock;

use crate::backend::BackendKind;
use crate::parallel::{Comm, UniverseComm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub backend: BackendKind,
    /// Rank among the processes sharing this node.
    pub shared_rank: usize,
    pub shared_size: usize,
    pub visible_devices: usize,
    /// Accelerator bound to this process, if any are visible.
    pub device: Option<usize>,
    /// Worker threads available to local kernels.
    pub threads: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Accelerators visible on this node; `None` means none.
    pub visible_devices: Option<usize>,
    /// Worker threads per process; `None` splits the node's cores between its ranks.
    pub threads: Option<usize>,
}

impl RuntimeConfig {
    /// Device visibility from `CUDA_VISIBLE_DEVICES`.
    pub fn from_env() -> Self {
        let visible_devices = std::env::var("CUDA_VISIBLE_DEVICES").ok().map(|s| count_devices(&s));
        Self { visible_devices, threads: None }
    }

    pub fn with_devices(mut self, n: usize) -> Self {
        self.visible_devices = Some(n);
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }
}

/// Number of usable entries in a device list such as `"0,1,3"`; parsing stops at
/// the first invalid entry.
pub(crate) fn count_devices(list: &str) -> usize {
    list.split(',')
        .map(str::trim)
        .take_while(|t| {
            !t.is_empty() && (t.parse::<usize>().is_ok() || t.starts_with("GPU-") || t.starts_with("MIG-"))
        })
        .count()
}

/// Device for the process with node-local rank `shared_rank`.
pub fn assign_device(shared_rank: usize, visible_devices: usize) -> Option<usize> {
    (visible_devices > 0).then(|| shared_rank % visible_devices)
}

static NATIVE_RUNTIME: OnceLock<RuntimeState> = OnceLock::new();
static PARCSR_RUNTIME: OnceLock<RuntimeState> = OnceLock::new();

fn slot(kind: BackendKind) -> &'static OnceLock<RuntimeState> {
    match kind {
        BackendKind::Native => &NATIVE_RUNTIME,
        BackendKind::ParCsr => &PARCSR_RUNTIME,
    }
}

pub fn is_initialized(kind: BackendKind) -> bool {
    slot(kind).get().is_some()
}

pub fn runtime_state(kind: BackendKind) -> Option<&'static RuntimeState> {
    slot(kind).get()
}

pub(crate) fn init_if_needed(kind: BackendKind, comm: &UniverseComm, config: &RuntimeConfig) -> &'static RuntimeState {
    let slot = slot(kind);
    if let Some(state) = slot.get() {
        log::trace!("{kind} runtime already initialized");
        return state;
    }
    slot.get_or_init(|| initialize(kind, comm, config))
}

fn initialize(kind: BackendKind, comm: &UniverseComm, config: &RuntimeConfig) -> RuntimeState {
    let shared_rank = comm.shared_rank();
    let shared_size = comm.shared_size().max(1);
    let visible_devices = config.visible_devices.unwrap_or(0);
    // the device is fixed before any kernel of this backend runs
    let device = assign_device(shared_rank, visible_devices);
    match device {
        Some(d) => log::info!("{kind} runtime: node-local rank {shared_rank} bound to device {d} of {visible_devices}"),
        None => log::debug!("{kind} runtime: no accelerator visible, host execution"),
    }
    let threads = configure_threads(config.threads, shared_size);
    log::debug!("{kind} runtime: {threads} worker threads for {shared_size} ranks on this node");
    RuntimeState { backend: kind, shared_rank, shared_size, visible_devices, device, threads }
}

#[cfg(feature = "rayon")]
fn configure_threads(requested: Option<usize>, shared_size: usize) -> usize {
    let n = requested.unwrap_or_else(|| (num_cpus::get() / shared_size).max(1));
    if rayon::ThreadPoolBuilder::new().num_threads(n).build_global().is_err() {
        log::debug!("rayon global pool already configured");
    }
    rayon::current_num_threads()
}

#[cfg(not(feature = "rayon"))]
fn configure_threads(_requested: Option<usize>, _shared_size: usize) -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_node_rank_modulo_visible() {
        assert_eq!(assign_device(0, 4), Some(0));
        assert_eq!(assign_device(5, 4), Some(1));
        assert_eq!(assign_device(3, 1), Some(0));
        assert_eq!(assign_device(2, 0), None);
    }

    #[test]
    fn device_lists_stop_at_first_invalid_entry() {
        assert_eq!(count_devices("0,1,2"), 3);
        assert_eq!(count_devices(""), 0);
        assert_eq!(count_devices("0, 2,-1,3"), 2);
        assert_eq!(count_devices("GPU-8932f937,MIG-1"), 2);
    }

    #[test]
    fn second_init_returns_the_first_state() {
        let comm = UniverseComm::Serial;
        let first = init_if_needed(BackendKind::ParCsr, &comm, &RuntimeConfig::default());
        let again = init_if_needed(BackendKind::ParCsr, &comm, &RuntimeConfig::default().with_devices(8));
        assert!(std::ptr::eq(first, again));
        assert!(is_initialized(BackendKind::ParCsr));
        assert_eq!(runtime_state(BackendKind::ParCsr), Some(first));
    }
}
