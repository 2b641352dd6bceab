#![no_main]

use {
    libfuzzer_sys::fuzz_target,
    tagcode::{record, Descriptor},
};

fuzz_target!(|text: &str| {
    let desc = record! {
        a: Descriptor::int32(),
        b: Descriptor::string().nullable(),
        c: Descriptor::list(Descriptor::float64()),
        m: Descriptor::map(Descriptor::uint32(), Descriptor::string()),
    };

    // Arbitrary text must never panic.
    let Ok(value) = tagcode::json::from_str(&desc, text) else {
        return;
    };

    // Accepted input must round-trip through our own writer.
    let out = tagcode::json::to_string(&desc, &value).expect("re-write accepted value");
    let roundtrip = tagcode::json::from_str(&desc, &out).expect("roundtrip parse");
    assert_eq!(value, roundtrip);
});
