use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sheet2doc::generator::Generator;
use sheet2doc::parser::SchemaParser;
use sheet2doc::{convert_sheet, ConvertOptions, Context, Sheet, YamlStyle};

// ============================================================================
// Test Data: Generated Sheets
// ============================================================================

/// An array-of-maps sheet with a nested map and a nested array per row.
fn generate_items_sheet(rows: usize) -> Sheet {
    let mut sheet = Sheet::new("!items");
    sheet.set(1, 1, "Generated items");
    sheet.set(2, 1, "$[]");
    sheet.set(3, 1, "${}");
    for (column, literal) in ["id", "name", "stats${}", "", "tags$[]", "active"]
        .into_iter()
        .enumerate()
    {
        sheet.set(4, column as u32 + 1, literal);
    }
    sheet.set(5, 3, "hp");
    sheet.set(5, 4, "mp");
    sheet.set(5, 5, "tag");
    sheet.set(6, 1, "$scheme_end");

    for i in 0..rows {
        let row = 7 + i as u32;
        sheet.set(row, 1, i as f64);
        sheet.set(row, 2, format!("Item {i}"));
        sheet.set(row, 3, (i * 10) as f64);
        if i % 3 != 0 {
            sheet.set(row, 4, "5");
        }
        sheet.set(row, 5, format!("tag-{}", i % 7));
        sheet.set(row, 6, i % 2 == 0);
    }

    for range in ["A2:F2", "A3:F3", "C4:D4"] {
        // Ranges are static and well-formed.
        let _ = sheet.merge_a1(range);
    }
    sheet
}

/// A map sheet whose rows mostly collide on the same keys.
fn generate_settings_sheet(rows: usize) -> Sheet {
    let mut sheet = Sheet::new("!settings");
    sheet.set(2, 1, "title");
    sheet.set(2, 2, "width");
    sheet.set(2, 3, "height");
    sheet.set(3, 1, "$scheme_end");
    for i in 0..rows {
        let row = 4 + i as u32;
        sheet.set(row, 1, format!("Title {i}"));
        sheet.set(row, 2, "800");
        sheet.set(row, 3, "600");
    }
    sheet
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_schema_parser(c: &mut Criterion) {
    let sheet = generate_items_sheet(10);
    let ctx = Context::default();
    c.bench_function("schema_parser_items", |b| {
        b.iter(|| {
            let parser = SchemaParser::new(black_box(&sheet), &ctx).unwrap();
            parser.parse().unwrap()
        })
    });
}

// ============================================================================
// Generator Benchmarks
// ============================================================================

fn bench_generator_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator_row_scaling");
    let ctx = Context::default();

    for size in [10, 100, 1000, 5000] {
        let sheet = generate_items_sheet(size);
        let schema = SchemaParser::new(&sheet, &ctx).unwrap().parse().unwrap();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sheet, |b, sheet| {
            b.iter(|| {
                Generator::new(&schema.tree, black_box(sheet), &ctx)
                    .generate(schema.data_rows())
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_map_root_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_root_accumulation");
    let ctx = Context::default();

    for size in [100, 1000] {
        let sheet = generate_settings_sheet(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sheet, |b, sheet| {
            b.iter(|| convert_sheet(black_box(sheet), &ctx).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks (with serialization)
// ============================================================================

fn bench_e2e_with_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_with_serialization");
    let sheet = generate_items_sheet(500);

    let formats = [
        ("json", ConvertOptions::default()),
        ("yaml_block", ConvertOptions::yaml()),
        (
            "yaml_flow",
            ConvertOptions {
                yaml_style: YamlStyle::Flow,
                ..ConvertOptions::yaml()
            },
        ),
    ];

    for (name, options) in formats {
        let ctx = Context::new(options);
        group.bench_with_input(BenchmarkId::from_parameter(name), &sheet, |b, sheet| {
            b.iter(|| convert_sheet(black_box(sheet), &ctx).unwrap().render())
        });
    }

    group.finish();
}

criterion_group!(parser_benches, bench_schema_parser);
criterion_group!(
    generator_benches,
    bench_generator_scaling,
    bench_map_root_accumulation
);
criterion_group!(e2e_benches, bench_e2e_with_serialization);
criterion_main!(parser_benches, generator_benches, e2e_benches);
