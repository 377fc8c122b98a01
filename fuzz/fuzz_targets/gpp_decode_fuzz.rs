//! Decode fuzz target: feed arbitrary strings to the strict and lenient GPP decoders.
//! Neither may panic; a decoded model must re-encode without error.
//! Build with: cargo fuzz run gpp_decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(mut model) = gppcodec::GppModel::from_encoded(s) {
        let _ = model.encode();
    }
    let _ = gppcodec::decode_gpp_frame(s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run gpp_decode_fuzz");
}
