use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tidedb_protocol::{Command, Frame, decode_request};

fn encoded(frame: &Frame) -> Bytes {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    buf.freeze()
}

fn bench_decode_set_request(c: &mut Criterion) {
    let data = encoded(&Frame::array_from_strs(&["SET", "mykey", "myvalue", "PX", "3600"]));

    c.bench_function("decode_set_request", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(black_box(data.as_ref()));
            let args = decode_request(&mut buf).unwrap().unwrap();
            Command::from_args(args).unwrap()
        })
    });
}

fn bench_decode_bulk_1kb(c: &mut Criterion) {
    let payload = "x".repeat(1024);
    let data = encoded(&Frame::array_from_strs(&["RPUSH", "list", &payload]));

    c.bench_function("decode_rpush_1kb", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(black_box(data.as_ref()));
            decode_request(&mut buf).unwrap().unwrap()
        })
    });
}

fn bench_decode_pipeline_100(c: &mut Criterion) {
    let one = encoded(&Frame::array_from_strs(&["LPOP", "queue"]));
    let mut pipeline = BytesMut::new();
    for _ in 0..100 {
        pipeline.extend_from_slice(&one);
    }
    let pipeline = pipeline.freeze();

    c.bench_function("decode_pipeline_100", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(black_box(pipeline.as_ref()));
            let mut n = 0;
            while let Some(args) = decode_request(&mut buf).unwrap() {
                n += args.len();
            }
            n
        })
    });
}

fn bench_encode_simple_string(c: &mut Criterion) {
    let frame = Frame::Simple("OK".into());

    c.bench_function("encode_simple_string", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(64);
            black_box(&frame).encode(&mut buf);
            buf
        })
    });
}

fn bench_encode_lrange_reply(c: &mut Criterion) {
    let items = (0..100).map(|i| Bytes::from(format!("item:{i}"))).collect();
    let frame = Frame::array_from_bulks(items);

    c.bench_function("encode_lrange_100", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(2048);
            black_box(&frame).encode(&mut buf);
            buf
        })
    });
}

criterion_group!(
    benches,
    bench_decode_set_request,
    bench_decode_bulk_1kb,
    bench_decode_pipeline_100,
    bench_encode_simple_string,
    bench_encode_lrange_reply,
);
criterion_main!(benches);
