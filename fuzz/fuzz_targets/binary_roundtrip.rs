#![no_main]

use {
    libfuzzer_sys::fuzz_target,
    tagcode::{record, Descriptor},
};

fn full_schema() -> Descriptor {
    record! {
        a: Descriptor::int32(),
        b: Descriptor::string().nullable(),
        c: Descriptor::list(Descriptor::float64()),
        d: record! {
            x: Descriptor::uint8(),
            y: Descriptor::map(Descriptor::string(), Descriptor::uint64()),
        },
        e: Descriptor::bool(),
    }
}

/// A strict prefix of [`full_schema`]: decoding data produced under the
/// full schema must skip the trailing fields value by value.
fn narrow_schema() -> Descriptor {
    record! {
        a: Descriptor::int32(),
        b: Descriptor::string().nullable(),
    }
}

fuzz_target!(|data: &[u8]| {
    let full = full_schema();
    let narrow = narrow_schema();

    // Arbitrary bytes must never panic, under either schema.
    let Ok(value) = tagcode::binary::decode(&full, data) else {
        let _ = tagcode::binary::decode(&narrow, data);
        return;
    };

    // Accepted input must round-trip exactly.
    let bytes = tagcode::binary::encode(&full, &value).expect("re-encode accepted value");
    let roundtrip = tagcode::binary::decode(&full, &bytes).expect("roundtrip decode");
    assert_eq!(value, roundtrip);

    // The narrower schema must accept the same bytes by skipping the
    // unknown trailing fields, and agree on the common prefix.
    let prefix = tagcode::binary::decode(&narrow, &bytes).expect("prefix decode");
    let (Some(full_fields), Some(prefix_fields)) = (value.as_record(), prefix.as_record())
    else {
        unreachable!("record schema decodes to records");
    };
    assert_eq!(&full_fields[..2], prefix_fields);
});
