use serde::{Deserialize, Serialize};

/// Deep link that opens the KakaoPay app.
pub const KAKAOPAY_DEEP_LINK: &str = "kakaopay://";

const KAKAOPAY_APP_STORE: &str = "https://apps.apple.com/kr/app/kakaopay/id1464496236";
const KAKAOPAY_PLAY_STORE: &str = "https://play.google.com/store/apps/details?id=com.kakaopay.app";

/// Bank name -> Korean financial institution code.
const BANK_CODES: &[(&str, &str)] = &[
    ("국민은행", "004"),
    ("KB국민은행", "004"),
    ("신한은행", "088"),
    ("우리은행", "020"),
    ("하나은행", "081"),
    ("농협은행", "011"),
    ("기업은행", "003"),
    ("SC제일은행", "023"),
    ("카카오뱅크", "090"),
    ("토스뱅크", "092"),
    ("K뱅크", "089"),
    ("새마을금고", "045"),
    ("신협", "048"),
    ("우체국", "071"),
    ("수협은행", "007"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank: String,
    pub number: String,
    pub holder: String,
}

impl BankAccount {
    /// Text placed on the clipboard when a guest taps "copy".
    pub fn copy_text(&self) -> String {
        format!("{} {} {}", self.bank, self.number, self.holder)
    }

    pub fn bank_code(&self) -> Option<&'static str> {
        bank_code(&self.bank)
    }

    /// JSON payload for a transfer QR code.
    pub fn qr_payload(&self, timestamp_ms: i64) -> String {
        serde_json::json!({
            "type": "account",
            "bank": self.bank,
            "number": self.number,
            "holder": self.holder,
            "timestamp": timestamp_ms,
        })
        .to_string()
    }
}

pub fn bank_code(bank: &str) -> Option<&'static str> {
    let bank = bank.trim();
    BANK_CODES
        .iter()
        .find(|(name, _)| *name == bank)
        .map(|(_, code)| *code)
}

/// Client platform as far as app deep linking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Mobile,
    Desktop,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ["iphone", "ipad", "ipod"].iter().any(|t| ua.contains(t)) {
            Platform::Ios
        } else if ua.contains("android") {
            Platform::Android
        } else if ["blackberry", "iemobile", "opera mini"]
            .iter()
            .any(|t| ua.contains(t))
        {
            Platform::Mobile
        } else {
            Platform::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        self != Platform::Desktop
    }

    /// Store page to fall back to when the payment app is missing.
    pub fn app_store_url(self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some(KAKAOPAY_APP_STORE),
            Platform::Android | Platform::Mobile => Some(KAKAOPAY_PLAY_STORE),
            Platform::Desktop => None,
        }
    }

    pub fn pay_deep_link(self) -> Option<&'static str> {
        self.is_mobile().then_some(KAKAOPAY_DEEP_LINK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> BankAccount {
        BankAccount {
            bank: "신한은행".into(),
            number: "110-123-456789".into(),
            holder: "Seoyeon Lee".into(),
        }
    }

    #[test]
    fn copy_text_joins_fields() {
        assert_eq!(account().copy_text(), "신한은행 110-123-456789 Seoyeon Lee");
    }

    #[test]
    fn bank_codes() {
        assert_eq!(account().bank_code(), Some("088"));
        assert_eq!(bank_code(" 카카오뱅크 "), Some("090"));
        assert_eq!(bank_code("Unknown Bank"), None);
    }

    #[test]
    fn qr_payload_carries_account() {
        let value: serde_json::Value =
            serde_json::from_str(&account().qr_payload(42)).unwrap();
        assert_eq!(value["type"], "account");
        assert_eq!(value["number"], "110-123-456789");
        assert_eq!(value["timestamp"], 42);
    }

    #[test]
    fn platform_detection() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8)";
        let desktop = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

        assert_eq!(Platform::from_user_agent(iphone), Platform::Ios);
        assert_eq!(Platform::from_user_agent(android), Platform::Android);
        assert_eq!(Platform::from_user_agent(desktop), Platform::Desktop);
        assert_eq!(Platform::from_user_agent("Opera Mini/8"), Platform::Mobile);
    }

    #[test]
    fn desktop_gets_no_deep_link() {
        assert_eq!(Platform::Desktop.pay_deep_link(), None);
        assert_eq!(Platform::Desktop.app_store_url(), None);
        assert_eq!(Platform::Ios.pay_deep_link(), Some(KAKAOPAY_DEEP_LINK));
        assert!(Platform::Ios.app_store_url().unwrap().contains("apple.com"));
        assert!(Platform::Android.app_store_url().unwrap().contains("play.google.com"));
    }
}
