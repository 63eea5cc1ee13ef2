use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use discover::protocol::{decode_planets, DelimiterCodec};
use discover::PodTarget;
use tokio_util::codec::Decoder;

const DELIM: &str = "<???DONE???---";

fn planet_payload(groups: usize, per_group: usize) -> String {
    let groups: Vec<String> = (0..groups)
        .map(|g| {
            let planets: Vec<String> = (0..per_group)
                .map(|p| {
                    format!(
                        r#"{{"Name":"P{g}-{p}","Position":{{"x":{p}.5,"y":{g}.25,"z":-1}},"Seed":{p}}}"#
                    )
                })
                .collect();
            format!(r#""group{}":[{}]"#, g, planets.join(","))
        })
        .collect();
    format!("{{{}}}", groups.join(","))
}

fn bench_decode_chunked(c: &mut Criterion) {
    let payload = format!("{}{}", planet_payload(8, 64), DELIM);
    let bytes = payload.as_bytes();

    c.bench_function("decode_chunked_1k", |b| {
        b.iter(|| {
            let mut codec = DelimiterCodec::new(DELIM).unwrap();
            let mut buf = BytesMut::with_capacity(bytes.len());
            let mut message = None;
            for chunk in bytes.chunks(1024) {
                buf.extend_from_slice(chunk);
                if let Some(m) = codec.decode(&mut buf).unwrap() {
                    message = Some(m);
                }
            }
            black_box(message)
        })
    });
}

fn bench_decode_planets(c: &mut Criterion) {
    let payload = planet_payload(8, 64);
    let target = PodTarget::new("127.0.0.1", 14000);

    c.bench_function("decode_planets_512", |b| {
        b.iter(|| black_box(decode_planets(black_box(&payload), &target).unwrap()))
    });
}

criterion_group!(benches, bench_decode_chunked, bench_decode_planets);
criterion_main!(benches);
