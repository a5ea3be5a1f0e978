//! Fuzz target: `TimeOfDay::parse`
//!
//! Any accepted literal must lie inside the day and render back to a
//! string that parses to the same instant.
//!
//! cargo fuzz run fuzz_time_of_day

#![no_main]

use libfuzzer_sys::fuzz_target;
use poolcontrol::schedule::TimeOfDay;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(time) = TimeOfDay::parse(text) {
        assert!(time.secs() < 86_400);
        assert_eq!(TimeOfDay::parse(&time.to_string()), Ok(time));
    }
});
