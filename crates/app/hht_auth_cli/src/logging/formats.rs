use flexi_logger::DeferredNow;
use log::{Level, Record};

/// `LEVEL message`, with the level dropped for plain info lines.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    match record.level() {
        Level::Info => write!(w, "{}", record.args()),
        level => write!(w, "{level:<5} {}", record.args()),
    }
}
