#![no_main]

use arbitrary::Arbitrary;
use commonware_schema::{addressable, Field, Model, ScalarKind, Type};
use libfuzzer_sys::fuzz_target;
use std::{collections::BTreeMap, sync::Arc};

#[derive(Arbitrary, Clone, Debug, Default, PartialEq)]
struct Inner {
    flag: bool,
    small: i8,
    wide: u64,
    note: Option<String>,
}

addressable!(Inner { flag, small, wide, note });

#[derive(Arbitrary, Clone, Debug, Default, PartialEq)]
struct Outer {
    id: i32,
    ratio: f64,
    label: String,
    payload: Vec<u8>,
    inner: Inner,
    history: Vec<Inner>,
    counts: BTreeMap<u16, i64>,
    extra: Option<Vec<String>>,
}

addressable!(Outer { id, ratio, label, payload, inner, history, counts, extra });

fn models() -> Model {
    let inner = Arc::new(
        Model::new(
            "inner",
            [
                Field::new(0, "flag", Type::BOOL),
                Field::new(1, "small", Type::I8),
                Field::new(2, "wide", Type::U64),
                Field::optional(3, "note", Type::TEXT),
            ],
        )
        .unwrap(),
    );
    Model::new(
        "outer",
        [
            Field::new(0, "id", Type::I32),
            Field::new(1, "ratio", Type::F64),
            Field::new(2, "label", Type::TEXT),
            Field::new(3, "payload", Type::list(Type::U8)),
            Field::new(4, "inner", Type::model(&inner)),
            Field::new(5, "history", Type::list(Type::model(&inner))),
            Field::new(6, "counts", Type::map(ScalarKind::U16, Type::I64)),
            Field::optional(7, "extra", Type::list(Type::TEXT)),
        ],
    )
    .unwrap()
}

fuzz_target!(|input: Outer| {
    let model = models();
    let encoded = model.encode(&input).unwrap();

    let mut decoded = Outer::default();
    model.decode(encoded.clone(), &mut decoded).unwrap();
    // Compare bit patterns so NaN ratios round trip too.
    assert_eq!(decoded.ratio.to_bits(), input.ratio.to_bits());
    decoded.ratio = input.ratio;
    if !input.ratio.is_nan() {
        assert_eq!(decoded, input);
    }

    let record = model.decode_record(encoded.clone()).unwrap();
    assert_eq!(model.encode(&record).unwrap(), encoded);
});
