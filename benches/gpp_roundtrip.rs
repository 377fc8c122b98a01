//! Benchmark: decode vs decode+encode for a multi-section GPP string, plus the cached
//! re-encode path (no field edits) against a forced full re-encode.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gppcodec::sections::{tcf_eu_v2, us};
use gppcodec::{GppModel, Value};

fn sample() -> String {
    let mut model = GppModel::new();
    let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    model.set_field_value("tcfeuv2", tcf_eu_v2::CREATED, Value::Datetime(when)).unwrap();
    model.set_field_value("tcfeuv2", tcf_eu_v2::LAST_UPDATED, Value::Datetime(when)).unwrap();
    model.set_field_value("tcfeuv2", tcf_eu_v2::CMP_ID, Value::Int(300)).unwrap();
    model
        .set_field_value("tcfeuv2", tcf_eu_v2::VENDOR_CONSENTS, Value::IntList((1..=400).step_by(3).collect()))
        .unwrap();
    model.set_field_value("tcfeuv2", tcf_eu_v2::VENDORS_DISCLOSED, Value::IntList((1..=800).collect())).unwrap();
    model.set_field_value("uspv1", "Notice", Value::Char('Y')).unwrap();
    model.set_field_value("usnat", us::SALE_OPT_OUT_NOTICE, Value::Int(1)).unwrap();
    model.set_field_value("usnat", us::SALE_OPT_OUT, Value::Int(1)).unwrap();
    model.encode().unwrap()
}

fn bench_gpp(c: &mut Criterion) {
    let encoded = sample();

    c.bench_function("decode", |b| {
        b.iter(|| GppModel::from_encoded(black_box(&encoded)).unwrap());
    });

    c.bench_function("decode_encode_cached", |b| {
        b.iter(|| {
            let mut m = GppModel::from_encoded(black_box(&encoded)).unwrap();
            m.encode().unwrap()
        });
    });

    c.bench_function("decode_encode_dirty", |b| {
        b.iter(|| {
            let mut m = GppModel::from_encoded(black_box(&encoded)).unwrap();
            for name in ["tcfeuv2", "uspv1", "usnat"] {
                if let Some(s) = m.section_mut(name) {
                    s.set_is_dirty(true);
                }
            }
            m.encode().unwrap()
        });
    });
}

criterion_group!(benches, bench_gpp);
criterion_main!(benches);
