use chrono::NaiveDate;
use countytab_core::{
    normalize, CanonicalTable, EntityList, HeaderContext, HeaderParser, NormalizeOptions,
};
use countytab_sheet::{CellValue, Sheet};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A raw export with `entities` rows and `days` date columns, headers in the
/// trailing-token encoding and a notes row at the bottom.
fn raw_export(entities: usize, days: usize) -> (Sheet, EntityList) {
    let start = NaiveDate::from_ymd_opt(2020, 3, 4).unwrap();
    let mut sheet = Sheet::new();

    let mut header = vec![CellValue::from("County Name")];
    for day in 0..days {
        let date = start + chrono::Duration::days(day as i64);
        header.push(CellValue::from(format!("Cases\n{}*", date.format("%m/%d/%Y"))));
    }
    sheet.row_append(header);

    let names: Vec<String> = (0..entities).map(|i| format!("County{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        let mut row = vec![CellValue::from(name.to_uppercase())];
        for day in 0..days {
            if (i + day) % 17 == 0 {
                row.push(CellValue::from("--"));
            } else {
                row.push(CellValue::Int((i * 10 + day) as i64));
            }
        }
        sheet.row_append(row);
    }
    sheet.row_append(vec![CellValue::from("Notes")]);

    (sheet, EntityList::new(names).unwrap())
}

fn bench_headers(c: &mut Criterion) {
    let mut group = c.benchmark_group("headers");
    let parser = HeaderParser::default();
    let ctx = HeaderContext {
        fallback_year: 2020,
        range_marker: "Through",
    };

    let date_cell = CellValue::from(NaiveDate::from_ymd_opt(2020, 8, 16).unwrap());
    let range = CellValue::from("Tests Through August 3*");
    let token = CellValue::from("Cases\n08/15/2020*");
    let short = CellValue::from("Fatalities 08/15");

    group.bench_function("date_cell", |b| {
        b.iter(|| parser.parse(black_box(&date_cell), &ctx))
    });

    group.bench_function("range_marker", |b| {
        b.iter(|| parser.parse(black_box(&range), &ctx))
    });

    group.bench_function("trailing_token", |b| {
        b.iter(|| parser.parse(black_box(&token), &ctx))
    });

    group.bench_function("month_day", |b| {
        b.iter(|| parser.parse(black_box(&short), &ctx))
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let options = NormalizeOptions::new(2020);

    // 254 Texas counties
    for days in [30, 180, 365].iter() {
        let (sheet, entities) = raw_export(254, *days);

        group.bench_with_input(BenchmarkId::new("counties_254", days), days, |b, _| {
            b.iter(|| normalize(black_box(&sheet), black_box(&entities), &options))
        });
    }

    group.finish();
}

fn bench_derived(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived");
    let (sheet, entities) = raw_export(254, 365);
    let table: CanonicalTable = normalize(&sheet, &entities, &NormalizeOptions::new(2020)).unwrap();

    group.bench_function("totals", |b| b.iter(|| black_box(&table).totals()));

    group.bench_function("summary_7", |b| {
        let totals = table.totals();
        b.iter(|| black_box(&totals).summary(7))
    });

    group.bench_function("to_sheet", |b| b.iter(|| black_box(&table).to_sheet()));

    group.finish();
}

criterion_group!(benches, bench_headers, bench_normalize, bench_derived);
criterion_main!(benches);
