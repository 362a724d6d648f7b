use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

/// Initialise log4rs from `path`, or a plain console logger at `info` when the file is absent or invalid
pub fn init(path: &Path) {
    if path.exists() {
        match log4rs::init_file(path, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Invalid {}: {}, logging to console", path.display(), e),
        }
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Logger already initialised: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to build console logger: {}", e),
    }
}
