use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use rtcore::{Bvh, CoreConfig, PinholeCamera, ResumeRoute, RtCore, ScreenSize, scene};

fn criterion_benchmark(c: &mut Criterion) {
    let bvh = Bvh::build(scene::random_scene(2000, 1)).with_internal_root();
    let camera = PinholeCamera::framing(bvh.bounding_box(), ScreenSize::new(32, 24)).unwrap();
    let rays: Vec<_> = camera.rays().collect();

    c.bench_function("build_bvh", |b| {
        b.iter_batched(
            || scene::random_scene(2000, 1),
            Bvh::build,
            criterion::BatchSize::LargeInput,
        )
    });

    for route in [ResumeRoute::TraversalFifo, ResumeRoute::WorkingQueue] {
        let config = CoreConfig::builder().resume_route(route).build();
        c.bench_function(&format!("trace_scene_{route:?}"), |b| {
            b.iter_batched(
                || RtCore::new(bvh.clone(), config.clone()).unwrap(),
                |mut core| core.trace(&rays).unwrap(),
                criterion::BatchSize::LargeInput,
            )
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(20));
    targets = criterion_benchmark
}
criterion_main!(benches);
