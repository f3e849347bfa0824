//! Headless Chrome screenshots.

use super::{OgError, Screenshotter};
use crate::config::OgConfig;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::{Browser, LaunchOptions};
use std::fmt;
use std::thread;
use std::time::Duration;

/// Scroll offset that pulls lazily loaded images below the fold into view.
const LAZY_SCROLL_Y: u32 = 630;
const AFTER_SCROLL: Duration = Duration::from_millis(1000);
const AFTER_SCROLL_BACK: Duration = Duration::from_millis(500);

/// Launches a fresh headless Chrome per capture.
#[derive(Debug, Clone)]
pub struct ChromeScreenshotter {
    width: u32,
    height: u32,
    settle: Duration,
    navigation_timeout: Duration,
}

impl ChromeScreenshotter {
    pub fn new(config: &OgConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            settle: Duration::from_millis(config.settle_ms),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        }
    }

    fn launch(&self) -> Result<Browser, OgError> {
        Browser::new(LaunchOptions {
            sandbox: false,
            window_size: Some((self.width, self.height)),
            idle_browser_timeout: self.navigation_timeout + self.settle + Duration::from_secs(30),
            ..Default::default()
        })
        .map_err(|e| OgError::Browser(e.to_string()))
    }
}

fn capture_error<E: fmt::Display>(url: &str) -> impl Fn(E) -> OgError + '_ {
    move |e| OgError::Capture {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

impl Screenshotter for ChromeScreenshotter {
    fn capture(&self, url: &str) -> Result<Vec<u8>, OgError> {
        let browser = self.launch()?;
        let tab = browser.new_tab().map_err(capture_error(url))?;
        tab.set_default_timeout(self.navigation_timeout);
        tab.navigate_to(url)
            .map_err(capture_error(url))?
            .wait_until_navigated()
            .map_err(capture_error(url))?;

        thread::sleep(self.settle);
        tab.evaluate(&format!("window.scrollTo(0, {LAZY_SCROLL_Y})"), false)
            .map_err(capture_error(url))?;
        thread::sleep(AFTER_SCROLL);
        tab.evaluate("window.scrollTo(0, 0)", false).map_err(capture_error(url))?;
        thread::sleep(AFTER_SCROLL_BACK);

        let clip = Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(self.width),
            height: f64::from(self.height),
            scale: 1.0,
        };
        tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(capture_error(url))
    }
}
