use criterion::{black_box, criterion_group, criterion_main, Criterion};
use edefter::{Flattener, Parser, Schema};

fn synthetic_ledger(headers: usize, details: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<edefter:defter><gl-cor:accountingEntries>
  <gl-cor:documentInfo><gl-cor:uniqueID>BENCH</gl-cor:uniqueID></gl-cor:documentInfo>"#,
    );
    for h in 0..headers {
        xml.push_str(&format!(
            "<gl-cor:entryHeader><gl-cor:entryNumber>{}</gl-cor:entryNumber>",
            h
        ));
        for d in 0..details {
            xml.push_str(&format!(
                "<gl-cor:entryDetail><gl-cor:lineNumber>{}</gl-cor:lineNumber>\
                 <gl-cor:account><gl-cor:accountMainID>100</gl-cor:accountMainID></gl-cor:account>\
                 <gl-cor:amount>{}.00</gl-cor:amount><gl-cor:debitCreditCode>D</gl-cor:debitCreditCode>\
                 </gl-cor:entryDetail>",
                d, d
            ));
        }
        xml.push_str("</gl-cor:entryHeader>");
    }
    xml.push_str("</gl-cor:accountingEntries></edefter:defter>");
    xml
}

fn bench_flatten(c: &mut Criterion) {
    let parser = Parser::new();
    let schema = Schema::detail();
    let flattener = Flattener::new(&schema);

    let sample = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/yevmiye-sample.xml");
    c.bench_function("extract_sample_yevmiye", |b| {
        b.iter(|| {
            let doc = parser.parse_file(black_box(sample)).unwrap();
            flattener.flatten(&doc).unwrap()
        });
    });

    let xml = synthetic_ledger(1_000, 4);
    c.bench_function("parse_synthetic_4k_lines", |b| {
        b.iter(|| parser.parse_str(black_box(&xml)).unwrap());
    });

    let doc = parser.parse_str(&xml).unwrap();
    c.bench_function("flatten_synthetic_4k_lines", |b| {
        b.iter(|| flattener.flatten(black_box(&doc)).unwrap());
    });
}

criterion_group!(benches, bench_flatten);
criterion_main!(benches);
