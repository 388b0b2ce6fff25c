#![no_main]
use libfuzzer_sys::fuzz_target;
use slotplan_libs::bitmap::{decode, encode};
use slotplan_libs::week::WeekSchedule;

fuzz_target!(|week: WeekSchedule| {
    #[cfg(feature = "log")]
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply();

    let blob = encode(&week);
    assert_eq!(blob, encode(&week), "Encoding should be deterministic");
    assert_eq!(decode(&blob), Ok(week), "Decoding should restore the week");
});
