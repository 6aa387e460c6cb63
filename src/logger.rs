use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, Metadata, Record};

struct SimpleLogger {
    level: LevelFilter,
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{} {} - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Installs the logger behind the progress bars so log lines are printed
/// above them instead of through them.
pub fn init(level: LevelFilter, progress: MultiProgress) -> Result<(), log::SetLoggerError> {
    LogWrapper::new(progress, SimpleLogger { level })
        .try_init()
        .map(|()| log::set_max_level(level))
}
