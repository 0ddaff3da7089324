use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use encfilter::{Detector, Registry, Transcoder};

const TEXT_UTF8: &str = "こんにちは，世界！\n私の名前は Spiegel です。";

fn sample(repeat: usize) -> String {
    TEXT_UTF8.repeat(repeat)
}

fn bench_detect(c: &mut Criterion) {
    let registry = Registry::new();
    let detector = Detector::new(&registry).unwrap();
    let to_sjis = Transcoder::new(&registry, "Shift_JIS", "UTF-8").unwrap();
    let mut group = c.benchmark_group("detect");

    for repeat in [1, 16, 256] {
        let utf8 = sample(repeat).into_bytes();
        let sjis = to_sjis.convert(&utf8).unwrap();

        group.throughput(Throughput::Bytes(utf8.len() as u64));
        group.bench_with_input(BenchmarkId::new("utf8", repeat), &utf8, |b, data| {
            b.iter(|| detector.detect(black_box(data)).unwrap());
        });
        group.throughput(Throughput::Bytes(sjis.len() as u64));
        group.bench_with_input(BenchmarkId::new("shift_jis", repeat), &sjis, |b, data| {
            b.iter(|| detector.detect(black_box(data)).unwrap());
        });
    }
    group.finish();
}

fn bench_routes(c: &mut Criterion) {
    let registry = Registry::new();
    let utf8 = sample(256).into_bytes();
    let euc = Transcoder::new(&registry, "EUC-JP", "UTF-8").unwrap().convert(&utf8).unwrap();

    let cases = [
        ("encode_only", Transcoder::new(&registry, "Shift_JIS", "UTF-8").unwrap(), &utf8),
        ("decode_only", Transcoder::new(&registry, "UTF-8", "EUC-JP").unwrap(), &euc),
        ("transcode", Transcoder::new(&registry, "Shift_JIS", "EUC-JP").unwrap(), &euc),
        ("identity", Transcoder::new(&registry, "EUC-JP", "euc-jp").unwrap(), &euc),
    ];

    let mut group = c.benchmark_group("convert");
    for (name, transcoder, input) in cases {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| transcoder.convert(black_box(data)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_routes);
criterion_main!(benches);
