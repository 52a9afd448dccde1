use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    network::mqtt::bench_encode,
    network::mqtt::bench_decode_publish,
    network::mqtt::bench_framer,
    network::mqtt::bench_session_receive
);
criterion_main!(benches);
