//! Build protocol: values written through a `VectorWriter` are exactly what the
//! released vector holds, and the writer refuses indices outside the local block.

use std::sync::Arc;

use rand::Rng;
use sparsebridge::*;

fn empty_vector(backend: &Backend, n: usize) -> Vector {
    let dist = Arc::new(Distribution::uniform(n, UniverseComm::serial()));
    Vector::new(backend, Arc::new(Space::named("unknowns", n)), dist).unwrap()
}

#[test]
fn released_vector_holds_the_written_values() {
    let mut rng = rand::thread_rng();
    for kind in BackendKind::ALL {
        let backend = Backend::init(kind, &UniverseComm::Serial);
        let la = backend.algebra();
        let values: Vec<f64> = (0..32).map(|_| rng.gen_range(-10.0..10.0)).collect();

        let mut w = VectorWriter::new(empty_vector(&backend, values.len()));
        for (i, &v) in values.iter().enumerate() {
            w.set(i, v).unwrap();
        }
        let x = w.release();
        assert_eq!(x.values(), values.as_slice());

        // read back through the algebra: a copy sees the same entries
        let mut y = x.zeros_like();
        la.copy(&x, &mut y).unwrap();
        assert_eq!(y.values(), values.as_slice());
        let expected: f64 = values.iter().map(|v| v * v).sum();
        assert!((la.dot(&x, &y).unwrap() - expected).abs() <= 1e-12 * expected);
    }
}

#[test]
fn writing_one_past_the_end_fails() {
    let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
    let mut w = VectorWriter::new(empty_vector(&backend, 4));
    assert_eq!(w.len(), 4);
    assert_eq!(w.set(4, 1.0), Err(KError::OutOfBounds { index: 4, len: 4 }));
    assert!(w.get(4).is_err());
    assert!(w.set_global(7, 1.0).is_err());
    let v = w.release();
    assert!(v.values().iter().all(|&x| x == 0.0));
}

#[test]
fn global_writes_land_in_the_local_block() {
    let backend = Backend::init(BackendKind::ParCsr, &UniverseComm::Serial);
    let mut w = VectorWriter::new(empty_vector(&backend, 3));
    w.fill(-1.0);
    w.set_global(2, 5.0).unwrap();
    assert_eq!(w.get(2).unwrap(), 5.0);
    assert_eq!(w.release().values(), &[-1.0, -1.0, 5.0]);
}

#[test]
fn a_released_vector_can_be_rewritten() {
    let backend = Backend::init(BackendKind::Native, &UniverseComm::Serial);
    let mut w: VectorWriter = empty_vector(&backend, 2).into();
    w.as_mut_slice().copy_from_slice(&[1.0, 2.0]);
    let mut w = VectorWriter::new(w.release());
    assert_eq!(w.get(1).unwrap(), 2.0);
    w.set(1, 3.0).unwrap();
    assert_eq!(w.release().values(), &[1.0, 3.0]);
}
