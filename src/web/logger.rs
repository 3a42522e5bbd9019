// File logger with level macros, shared by the server and client paths.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct Logger {
    file: Mutex<Option<File>>,
}

impl Logger {
    pub fn new(log_path: &str) -> Self {
        let file = open_log_file(log_path);
        if file.is_none() {
            eprintln!("Log file {log_path} unavailable, logging to stderr only");
        }
        Logger {
            file: Mutex::new(file),
        }
    }

    pub fn log(&self, level: &str, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{timestamp}] [{level}] {message}\n");

        // stderr is the fallback, not a mirror of the file.
        match self.file.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(file) => {
                    let _ = file.write_all(line.as_bytes());
                    let _ = file.flush();
                }
                None => eprint!("{line}"),
            },
            Err(_) => eprint!("{line}"),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log("DEBUG", message);
    }

    pub fn info(&self, message: &str) {
        self.log("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        self.log("WARN", message);
    }

    pub fn error(&self, message: &str) {
        self.log("ERROR", message);
    }
}

fn open_log_file(log_path: &str) -> Option<File> {
    if let Some(parent) = Path::new(log_path).parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()
}

// Global logger instance
lazy_static::lazy_static! {
    pub static ref LOGGER: Logger = Logger::new("logs/gemini_chat_web.log");
}


#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::web::logger::LOGGER.debug(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::web::logger::LOGGER.info(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::web::logger::LOGGER.warn(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::web::logger::LOGGER.error(&format!($($arg)*));
    };
}
