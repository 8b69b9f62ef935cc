use reqwest::Url;

const WHATSAPP_SHARE_URL: &str = "https://wa.me/";

/// Link that opens WhatsApp with `text` prefilled, for platforms without a
/// native share sheet.
pub fn whatsapp_link(text: &str) -> Result<Url, Box<dyn std::error::Error>> {
    Ok(Url::parse_with_params(WHATSAPP_SHARE_URL, &[("text", text)])?)
}

/// Message shared alongside a narration.
pub fn share_message(script: &str) -> String {
    let headline = script.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    format!("🎙️ मराठी बातमी: {}", headline)
}
