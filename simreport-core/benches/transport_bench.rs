use criterion::{black_box, criterion_group, criterion_main, Criterion};
use simreport_core::{ElementId, Record, Transport, MAX_BUFFER_SIZE};
use simreport_telemetry::ReportMetrics;

fn sample_event(step: u64) -> Record {
    Record::Event {
        element: ElementId::new(step % 64),
        event: "flit_routed".into(),
        data: format!("vc={} hop={}", step % 4, step % 8),
        sim_time_ns: step * 1_000,
        at: chrono::Utc::now(),
    }
}

fn bench_framing(c: &mut Criterion) {
    let record = sample_event(42);
    c.bench_function("record_frame", |b| {
        b.iter(|| black_box(&record).frame().unwrap())
    });
}

fn bench_buffered_send(c: &mut Criterion) {
    let frames: Vec<Vec<u8>> = (0..1_000).map(|n| sample_event(n).frame().unwrap()).collect();
    c.bench_function("transport_1000_events", |b| {
        b.iter(|| {
            let mut transport = Transport::new(MAX_BUFFER_SIZE, ReportMetrics::new());
            transport.attach(std::io::sink(), "sink");
            for frame in &frames {
                transport.add_to_send_buffer(frame).unwrap();
            }
            transport.close();
        })
    });
}

criterion_group!(benches, bench_framing, bench_buffered_send);
criterion_main!(benches);
