use chrono::{Local, NaiveDate};
use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = "forecast_board";

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
