pub mod fake_browser;
