/*!
 * Benchmarks for the alignment stages.
 *
 * Measures performance of:
 * - Line grouping over jittered symbol clouds
 * - Line-level DP alignment
 * - Character-level DP alignment
 */

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use glyphbridge::alignment::{align_characters, align_lines, group_lines};
use glyphbridge::app_config::{AlignmentConfig, GroupingConfig};
use glyphbridge::geometry::BoundingBox;
use glyphbridge::recognition::{EngineSource, RecognizedSymbol};

const SYMBOL_POOL: &[&str] = &[
    "山", "川", "日", "月", "天", "地", "人", "心", "水", "火", "木", "金",
];

/// Generate a page of symbols: `lines` rows of `per_line` characters with
/// positional jitter, the way a real recognizer wobbles.
fn generate_page(
    source: EngineSource,
    lines: usize,
    per_line: usize,
    seed: u64,
) -> Vec<RecognizedSymbol> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut symbols = Vec::with_capacity(lines * per_line);

    for line in 0..lines {
        let top = line as f32 * 24.0;
        for i in 0..per_line {
            let jx: f32 = rng.random_range(-1.5..1.5);
            let jy: f32 = rng.random_range(-1.5..1.5);
            symbols.push(RecognizedSymbol {
                bbox: BoundingBox::new(i as f32 * 14.0 + jx, top + jy, 12.0, 14.0),
                symbol: SYMBOL_POOL[rng.random_range(0..SYMBOL_POOL.len())].to_string(),
                confidence: rng.random_range(0.6..1.0),
                source,
                line_index: None,
            });
        }
    }

    symbols
}

fn bench_line_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_grouping");
    let config = GroupingConfig::default();

    for lines in [10usize, 50, 200] {
        let symbols = generate_page(EngineSource::Primary, lines, 20, 7);
        group.throughput(Throughput::Elements(symbols.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &symbols, |b, symbols| {
            b.iter(|| group_lines(EngineSource::Primary, black_box(symbols.clone()), &config));
        });
    }

    group.finish();
}

fn bench_line_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_alignment");
    let grouping = GroupingConfig::default();
    let config = AlignmentConfig::default();

    for lines in [10usize, 50, 200] {
        let primary = group_lines(
            EngineSource::Primary,
            generate_page(EngineSource::Primary, lines, 20, 7),
            &grouping,
        );
        let secondary = group_lines(
            EngineSource::Secondary,
            generate_page(EngineSource::Secondary, lines, 20, 8),
            &grouping,
        );

        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(lines),
            &(primary, secondary),
            |b, (primary, secondary)| {
                b.iter(|| {
                    align_lines(
                        black_box(primary.clone()),
                        black_box(secondary.clone()),
                        &config,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_character_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("character_alignment");
    let grouping = GroupingConfig::default();
    let config = AlignmentConfig::default();

    for per_line in [20usize, 60, 100] {
        let primary = group_lines(
            EngineSource::Primary,
            generate_page(EngineSource::Primary, 4, per_line, 7),
            &grouping,
        );
        let secondary = group_lines(
            EngineSource::Secondary,
            generate_page(EngineSource::Secondary, 4, per_line, 8),
            &grouping,
        );
        let (aligned, _) = align_lines(primary, secondary, &config);

        group.throughput(Throughput::Elements(per_line as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(per_line),
            &aligned,
            |b, aligned| {
                b.iter(|| {
                    for line in aligned {
                        black_box(align_characters(line, &config));
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_line_grouping,
    bench_line_alignment,
    bench_character_alignment
);
criterion_main!(benches);
