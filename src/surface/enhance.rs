//! Per-page setup applied before any navigation

use anyhow::Result;
use chromiumoxide::{Page, cdp};

use crate::utils::constants::CHROME_USER_AGENT;

const AUTOMATION_MASK_JS: &str = r"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    if (!window.chrome) { window.chrome = {}; }
    if (!window.chrome.runtime) { window.chrome.runtime = {}; }
    Object.defineProperty(navigator, 'languages', { get: () => ['zh-CN', 'zh', 'en'] });
";

/// Hide automation markers and pin a desktop viewport
pub async fn enhance_page(page: &Page, headless: bool) -> Result<()> {
    match page.evaluate_on_new_document(AUTOMATION_MASK_JS).await {
        Ok(_) => log::debug!("Automation mask installed"),
        Err(e) => log::warn!("Failed to install automation mask: {e}"),
    }

    if let Err(e) = page.set_user_agent(CHROME_USER_AGENT).await {
        log::warn!("Failed to set user agent: {e}");
    }

    // Headed windows keep whatever size the user drags them to
    if headless {
        page.execute(
            cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
                .width(1280)
                .height(900)
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await?;
    }

    Ok(())
}
