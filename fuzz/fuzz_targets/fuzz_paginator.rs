#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u64, i64, i64)| {
    let (total, page, limit) = input;
    // Any input must give a consistent block without overflow panics
    let d = pagelite::Paginator::new(total, page, limit).pagination_data();
    assert!(d.page >= 1 && d.per_page >= 1);
    assert!(d.next == 0 || d.next == d.page + 1);
    assert!(d.prev == 0 || d.prev + 1 == d.page);
    if page < 1 {
        assert_eq!(pagelite::paginator::skip(page, limit), 0);
    }
});
