//! # Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use swerve_lib::kinematics::{ChassisVelocity, Params, SwerveKinematics};

fn kinematics_benchmark(c: &mut Criterion) {
    // A rectangular robot, wider than it is long
    let params = Params {
        module_pos_m_rb: [
            [0.28, 0.33],
            [0.28, -0.33],
            [-0.28, 0.33],
            [-0.28, -0.33],
        ],
        max_module_speed_ms: 4.5,
    };

    let mut kin = SwerveKinematics::new(params).unwrap();
    let vel = ChassisVelocity::field(3.0, -1.5, 2.0);

    c.bench_function("SwerveKinematics::to_module_states", |b| {
        b.iter(|| kin.to_module_states(black_box(&vel), black_box(0.7)).unwrap())
    });

    let states = kin.to_module_states(&vel, 0.7).unwrap();

    c.bench_function("SwerveKinematics::to_chassis_velocity", |b| {
        b.iter(|| kin.to_chassis_velocity(black_box(&states)))
    });
}

criterion_group!(benches, kinematics_benchmark);
criterion_main!(benches);
