//! Backend runtime: initialization happens once per process and per kind.

use std::ptr;
use std::thread;

use sparsebridge::backend::runtime::{assign_device, is_initialized, runtime_state};
use sparsebridge::*;

#[test]
fn repeated_init_returns_the_same_runtime() {
    let first = Backend::init(BackendKind::Native, &UniverseComm::Serial);
    let config = RuntimeConfig::default().with_devices(4).with_threads(1);
    let second = Backend::init_with(BackendKind::Native, &UniverseComm::Serial, &config);
    assert!(ptr::eq(first.runtime(), second.runtime()));
    assert!(is_initialized(BackendKind::Native));
    assert!(ptr::eq(runtime_state(BackendKind::Native).unwrap(), first.runtime()));
    assert_eq!(first.runtime().backend, BackendKind::Native);
    assert!(first.runtime().threads >= 1);
}

#[test]
fn concurrent_init_yields_one_state() {
    let addrs: Vec<usize> = (0..8)
        .map(|_| thread::spawn(|| Backend::init(BackendKind::ParCsr, &UniverseComm::Serial).runtime() as *const _ as usize))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();
    assert!(addrs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn device_follows_node_local_rank() {
    let devices: Vec<_> = (0..6).map(|rank| assign_device(rank, 4)).collect();
    assert_eq!(devices, [Some(0), Some(1), Some(2), Some(3), Some(0), Some(1)]);
    assert_eq!(assign_device(3, 0), None);
}

#[test]
fn runtime_state_is_consistent_with_device_rule() {
    let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
    let state = backend.runtime();
    assert_eq!(state.device, assign_device(state.shared_rank, state.visible_devices));
}

#[test]
fn backend_names_round_trip() {
    for kind in BackendKind::ALL {
        assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
    }
    assert!(matches!("petsc".parse::<BackendKind>(), Err(KError::InvalidOption(_))));
}
