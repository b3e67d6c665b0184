//! Randomized round trips over every type.

use bytes::Bytes;
use commonware_schema::{Field, Key, Model, Record, ScalarKind, Type, Value};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

fn random_key(rng: &mut StdRng, kind: ScalarKind) -> Key {
    match kind {
        ScalarKind::Bool => Key::Bool(rng.gen()),
        ScalarKind::I8 => Key::I8(rng.gen()),
        ScalarKind::I16 => Key::I16(rng.gen()),
        ScalarKind::I32 => Key::I32(rng.gen()),
        ScalarKind::I64 => Key::I64(rng.gen()),
        ScalarKind::U8 => Key::U8(rng.gen()),
        ScalarKind::U16 => Key::U16(rng.gen()),
        ScalarKind::U32 => Key::U32(rng.gen()),
        ScalarKind::U64 => Key::U64(rng.gen()),
        ScalarKind::F32 => Key::F32(rng.gen_range(-1e6..1e6)),
        ScalarKind::F64 => Key::F64(rng.gen_range(-1e12..1e12)),
        ScalarKind::Text => {
            let len = rng.gen_range(0..12);
            Key::Text((0..len).map(|_| rng.gen::<char>()).collect())
        }
        ScalarKind::Bytes => {
            let len = rng.gen_range(0..12);
            Key::Bytes(Bytes::from((0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>()))
        }
    }
}

fn random_value(rng: &mut StdRng, ty: &Type, depth: usize) -> Value {
    match ty {
        Type::Scalar(kind) => random_key(rng, *kind).into(),
        Type::List(element) => {
            let len = rng.gen_range(0..4);
            Value::List((0..len).map(|_| random_value(rng, element, depth)).collect())
        }
        Type::Map(key, element) => {
            let len = rng.gen_range(0..4);
            Value::Map(
                (0..len)
                    .map(|_| (random_key(rng, *key), random_value(rng, element, depth)))
                    .collect(),
            )
        }
        Type::Model(reference) => {
            let model = reference.resolve().unwrap();
            Value::Record(random_record(rng, &model, depth + 1))
        }
    }
}

fn random_record(rng: &mut StdRng, model: &Model, depth: usize) -> Record {
    let mut record = Record::new();
    for field in model.fields() {
        // Stop recursing through optional fields once deep enough.
        if !field.is_required() && (depth > 3 || rng.gen_bool(0.3)) {
            continue;
        }
        record.insert(field.label(), random_value(rng, field.ty(), depth));
    }
    record
}

fn random_type(rng: &mut StdRng, models: &[Arc<Model>], depth: usize) -> Type {
    let kind = ScalarKind::ALL[rng.gen_range(0..ScalarKind::ALL.len())];
    match rng.gen_range(0..4) {
        _ if depth > 2 => kind.into(),
        0 => Type::list(random_type(rng, models, depth + 1)),
        1 => Type::map(kind, random_type(rng, models, depth + 1)),
        2 if !models.is_empty() => Type::model(&models[rng.gen_range(0..models.len())]),
        _ => kind.into(),
    }
}

fn random_model(rng: &mut StdRng, name: String, models: &[Arc<Model>]) -> Model {
    let mut indices: Vec<u8> = (0..=u8::MAX).collect();
    let count = rng.gen_range(1..8);
    let fields = (0..count).map(|i| {
        let index = indices.swap_remove(rng.gen_range(0..indices.len()));
        let ty = random_type(rng, models, 0);
        if rng.gen_bool(0.5) {
            Field::required(index, format!("f{i}"), ty)
        } else {
            Field::optional(index, format!("f{i}"), ty)
        }
    });
    let fields: Vec<_> = fields.collect();
    Model::new(name, fields).unwrap()
}

#[test]
fn test_random_round_trip() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut models: Vec<Arc<Model>> = Vec::new();
    for i in 0..16 {
        let model = random_model(&mut rng, format!("m{i}"), &models);
        for _ in 0..16 {
            let record = random_record(&mut rng, &model, 0);
            let encoded = model.encode(&record).unwrap();
            let decoded = model.decode_record(encoded.clone()).unwrap();
            assert_eq!(decoded, record, "model {model:?}");

            // Identical input, identical bytes.
            assert_eq!(model.encode(&decoded).unwrap(), encoded);
        }
        models.push(Arc::new(model));
    }
}
