#![no_main]

use libfuzzer_sys::fuzz_target;
use callswap::Program;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(program) = Program::from_source(source) {
        // printing a loaded program must always load again
        let printed = program.to_string();
        let reparsed = Program::from_source(&printed).unwrap();
        assert_eq!(reparsed, program);
        let _ = program.verify();
    }
});
