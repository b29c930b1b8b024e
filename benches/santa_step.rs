use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{ArrayD, IxDyn};

use santa_optim::config::{SantaConfig, SolverConfig};
use santa_optim::context::ExecutionContext;
use santa_optim::optim::Solver;
use santa_optim::tensor::{self, Device};

fn santa_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("santa_step");
    for &n in &[4_096usize, 1 << 20] {
        for device in [Device::Cpu, Device::Parallel] {
            let w = tensor::zeros(&[n]);
            let grad = ArrayD::from_shape_fn(IxDyn(&[n]), |i| (i[0] % 17) as f32 * 1e-2 - 0.08);
            let config = SolverConfig {
                device,
                santa: SantaConfig {
                    explore: usize::MAX,
                    approx_g: true,
                    ..SantaConfig::default()
                },
                ..SolverConfig::default()
            };
            let mut ctx = ExecutionContext::new(device, Some(0)).unwrap();
            let mut solver = Solver::santa(vec![w.clone()], config).unwrap();
            group.bench_with_input(BenchmarkId::new(device.to_string(), n), &n, |b, _| {
                b.iter(|| {
                    w.set_grad(&grad).unwrap();
                    solver.step(&mut ctx, black_box(4e-6)).unwrap();
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, santa_step);
criterion_main!(benches);
