pub mod config;
pub mod logging;

pub mod capture;
pub mod driver;
pub mod output;
pub mod readiness;
pub mod url_list;
pub mod url_model;
pub mod wait;
