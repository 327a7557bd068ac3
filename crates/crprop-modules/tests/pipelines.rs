//! Module combinations driven through a `ModuleList`.

use std::sync::Arc;

use crprop_core::particle_id::{PHOTON, PROTON_PDG};
use crprop_core::units::{EEV, KPC, MPC};
use crprop_core::{ParticleState, SerialCounter, Vector3d};
use crprop_module::{Completion, Module, ModuleList, ProcessContext, REJECTED_KEY};
use crprop_modules::break_condition::DetectionLength;
use crprop_modules::{
    CubicBoundary, MaximumTrajectoryLength, PeriodicBox, ReflectiveBox, SimplePropagation,
};
use crprop_test_utils::candidate;
use crprop_test_utils::fixtures::CountingModule;
use proptest::prelude::*;

#[test]
fn detection_length_accepts_exactly_once() {
    let counter = Arc::new(CountingModule::new());
    let mut detection = DetectionLength::new(5.0 * MPC);
    detection.condition_mut().on_accept(counter.clone());

    let mut list = ModuleList::new();
    list.add(SimplePropagation::new(KPC, 2.0 * MPC).unwrap())
        .add(detection)
        .add(MaximumTrajectoryLength::new(9.0 * MPC));

    let mut c = candidate(PHOTON, EEV);
    let mut ctx = list.context(0, 0);
    assert_eq!(list.run(&mut c, false, false, &mut ctx), Completion::Finished);

    assert_eq!(counter.calls(), 1);
    assert!(!c.is_active());
    assert!(c.has_property(REJECTED_KEY));
}

#[test]
fn cubic_boundary_stops_at_the_wall() {
    let mut list = ModuleList::new();
    list.add(SimplePropagation::new(KPC, 10.0 * MPC).unwrap())
        .add(CubicBoundary::new(Vector3d::new(-MPC, -MPC, -MPC), 2.0 * MPC).unwrap());

    let mut c = candidate(PROTON_PDG, EEV);
    let mut ctx = list.context(0, 0);
    assert_eq!(list.run(&mut c, false, false, &mut ctx), Completion::Finished);

    assert!(!c.is_active());
    let x = c.current.position().x;
    assert!(x >= MPC);
    assert!(x <= MPC + 0.2 * KPC);
}

fn arb_offset() -> impl Strategy<Value = Vector3d> {
    (-50.0f64..50.0, -50.0f64..50.0, -50.0f64..50.0).prop_map(|(x, y, z)| Vector3d::new(x, y, z) * MPC)
}

fn inside(p: &Vector3d, origin: &Vector3d, size: &Vector3d) -> bool {
    (0..3).all(|i| p[i] >= origin[i] - 1e-6 * size[i] && p[i] <= origin[i] + size[i] * (1.0 + 1e-6))
}

proptest! {
    #[test]
    fn periodic_box_wraps_inside_and_keeps_displacement(
        position in arb_offset(),
        source in arb_offset(),
    ) {
        let origin = Vector3d::new(-2.0 * MPC, 0.0, MPC);
        let size = Vector3d::new(4.0 * MPC, 3.0 * MPC, 5.0 * MPC);
        let module = PeriodicBox::new(origin, size).unwrap();

        let mut c = crprop_core::Candidate::new(
            ParticleState::new(PROTON_PDG, EEV, source, Vector3d::x()),
            &SerialCounter::default(),
        );
        c.current.set_position(position);
        let displacement = position - source;
        module.process(&mut c, &mut ProcessContext::seeded(0)).unwrap();

        prop_assert!(inside(c.current.position(), &origin, &size));
        let after = c.current.position() - c.source.position();
        prop_assert!((after - displacement).norm() <= 1e-6 * MPC);
    }

    #[test]
    fn reflective_box_folds_inside(position in arb_offset(), direction in arb_offset()) {
        prop_assume!(direction.norm() > 0.0);
        let origin = Vector3d::zeros();
        let size = Vector3d::new(3.0 * MPC, 3.0 * MPC, 3.0 * MPC);
        let module = ReflectiveBox::new(origin, size).unwrap();

        let mut c = candidate(PROTON_PDG, EEV);
        c.current.set_position(position);
        c.current.set_direction(direction);
        let before = *c.current.direction();
        module.process(&mut c, &mut ProcessContext::seeded(0)).unwrap();

        prop_assert!(inside(c.current.position(), &origin, &size));
        let after = c.current.direction();
        for i in 0..3 {
            prop_assert!((after[i].abs() - before[i].abs()).abs() < 1e-12);
        }
    }
}
