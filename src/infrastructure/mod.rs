pub mod chromium_driver;
pub mod dom_driver;
pub mod js_executor;

pub use chromium_driver::ChromiumDriver;
pub use dom_driver::{DomDriver, Presence};
pub use js_executor::JsExecutor;
