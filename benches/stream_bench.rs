//! Benchmarks for segmentation and framing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fastgpt_proxy::stream::framer::Frames;
use fastgpt_proxy::stream::split;

fn answer() -> String {
    "FastGPT answers include citations like [1] and ünïcödé text 🌍. ".repeat(200)
}

fn bench_split(c: &mut Criterion) {
    let text = answer();

    c.bench_function("split_12k_chars_by_20", |b| {
        b.iter(|| black_box(split(black_box(&text), 20)))
    });
}

fn bench_frame_encoding(c: &mut Criterion) {
    let chunks = split(&answer(), 20);

    c.bench_function("encode_frames_12k_chars", |b| {
        b.iter(|| {
            let bytes: usize = Frames::with_created(chunks.clone(), "fastgpt", 0)
                .map(|f| f.encode().len())
                .sum();
            black_box(bytes);
        })
    });
}

criterion_group!(benches, bench_split, bench_frame_encoding);
criterion_main!(benches);
