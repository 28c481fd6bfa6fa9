use std::path::Path;

use chrono::NaiveDate;
use stationfetch_core::{DownloadSpec, TimeOfDay, plan};

fn month_spec(days: u32) -> DownloadSpec {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    DownloadSpec {
        station: "KXYZ".to_string(),
        state: "TS".to_string(),
        start_date: start,
        end_date: start + chrono::Days::new(u64::from(days - 1)),
        start_time: TimeOfDay::START_OF_DAY,
        end_time: TimeOfDay::END_OF_DAY,
        remote_base: "/forecast/stations".to_string(),
    }
}

#[divan::bench(args = [1, 7, 31])]
fn plan_full_days(bencher: divan::Bencher, days: u32) {
    let spec = month_spec(days);
    bencher.bench(|| plan(&spec, Path::new("stations")));
}

fn main() {
    divan::main();
}
