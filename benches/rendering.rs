use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_parse_message(c: &mut Criterion) {
    let raw = fixture("attachment.eml");
    c.bench_function("parse_attachment_message", |b| {
        b.iter(|| inbox2html::parser::mime::parse_message(&raw).unwrap())
    });
}

fn bench_render_related(c: &mut Criterion) {
    let raw = fixture("related.eml");
    c.bench_function("parse_and_render_related", |b| {
        b.iter(|| {
            let message = inbox2html::parser::mime::parse_message(&raw).unwrap();
            inbox2html::render::render(&message).len()
        })
    });
}

fn bench_decode_subject(c: &mut Criterion) {
    let subject = "=?ISO-8859-1?Q?caf=E9?= =?UTF-8?B?IOWxseeUsA==?= plain tail";
    c.bench_function("decode_encoded_subject", |b| {
        b.iter(|| inbox2html::parser::header::decode_header_value(subject))
    });
}

criterion_group!(
    benches,
    bench_parse_message,
    bench_render_related,
    bench_decode_subject
);
criterion_main!(benches);
