#![no_main]

use arbitrary::Arbitrary;
use commonware_schema::{
    Codec, Config, Declaration, Field, Model, RangeCfg, Record, ScalarKind, Type,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    max_depth: u8,
    max_len: u16,
    data: Vec<u8>,
}

fn models() -> (Arc<Declaration>, Arc<Model>) {
    let node = Declaration::new("node");
    let model = Model::builder("node")
        .required_by_default(false)
        .field(Field::required(0, "id", Type::I64))
        .field(Field::new(1, "name", Type::TEXT))
        .field(Field::new(2, "blob", Type::BYTES))
        .field(Field::new(3, "ratio", Type::F32))
        .field(Field::new(4, "flags", Type::list(Type::BOOL)))
        .field(Field::new(5, "scores", Type::map(ScalarKind::Text, Type::F64)))
        .field(Field::new(6, "children", Type::list(node.reference())))
        .field(Field::new(7, "index", Type::map(ScalarKind::U16, node.reference())))
        .bind(&node)
        .unwrap();
    (node, model)
}

fuzz_target!(|input: FuzzInput| {
    let (_node, model) = models();
    let codec = Codec::new(Config {
        max_depth: input.max_depth as usize,
        lengths: RangeCfg::from(..=input.max_len as usize),
    });

    // Decoding arbitrary bytes must fail cleanly, never panic.
    if let Ok(record) = codec.decode_record(&model, input.data.as_slice()) {
        // Anything accepted re-encodes, and the canonical encoding decodes to the same record.
        let encoded = codec.encode(&model, &record).unwrap();
        let decoded: Record = codec.decode_record(&model, encoded.clone()).unwrap();
        assert_eq!(decoded.len(), record.len());

        // Compare canonical bytes rather than values so NaN floats compare equal.
        assert_eq!(codec.encode(&model, &decoded).unwrap(), encoded);
    }
});
